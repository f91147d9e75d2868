//! Drives a launched node through the engine API like a consensus client would.

use assert_matches::assert_matches;
use ember_chainspec::{ChainSpec, ChainSpecBuilder, DEV};
use ember_config::Config;
use ember_interfaces::{
    test_utils::{
        generators::{self, random_blob_transaction, random_transaction},
        MockBlockTree, MockExecutor, MockTransactionSource,
    },
    transaction_pool::TransactionSource,
};
use ember_node_builder::{EngineNode, EngineNodeBuilder};
use ember_primitives::{constants::ETHEREUM_BLOCK_GAS_LIMIT, Address, Bytes, SealedHeader, B256};
use ember_rpc_engine_api::{EngineApiError, UNSUPPORTED_FORK_CODE};
use ember_rpc_types::engine::{
    ExecutionPayloadEnvelopeV2, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus,
};
use ember_tasks::TokioTaskExecutor;
use serde_json::json;
use std::{sync::Arc, time::Duration};

type TestNode = EngineNode<MockBlockTree, MockExecutor>;

fn launch_node(
    chain_spec: Arc<ChainSpec>,
    pool: MockTransactionSource,
) -> (TestNode, MockBlockTree) {
    let tree = MockBlockTree::with_chain_spec(&chain_spec);
    let node = EngineNodeBuilder::new(Config::default(), chain_spec)
        .with_tree(tree.clone())
        .with_executor(MockExecutor::default())
        .with_pool(pool)
        .launch(TokioTaskExecutor::default())
        .unwrap();
    (node, tree)
}

fn attributes(head: &SealedHeader, beacon_root: Option<B256>) -> PayloadAttributes {
    PayloadAttributes {
        timestamp: head.timestamp + 12,
        prev_randao: B256::repeat_byte(0x11),
        suggested_fee_recipient: Address::repeat_byte(0x22),
        withdrawals: Some(vec![]),
        parent_beacon_block_root: beacon_root,
    }
}

/// Waits until the best payload of the job includes `count` transactions.
async fn wait_for_transactions(node: &TestNode, id: PayloadId, count: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let included = node.payload_builder.best_payload(id).map(|p| p.block().body.len());
            if included == Some(count) {
                return
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap();
}

/// Versioned hashes of the blob transactions in `body`, in block order.
fn versioned_hashes(pool: &MockTransactionSource, body: &[Bytes]) -> Vec<B256> {
    let pending = pool.pending();
    body.iter()
        .filter_map(|encoded| pending.iter().find(|tx| &tx.encoded == encoded))
        .flat_map(|tx| tx.blob_versioned_hashes.clone())
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn build_and_import_blob_payload() {
    ember_tracing::init_test_tracing();
    let mut rng = generators::rng();

    let pool = MockTransactionSource::default();
    pool.extend([
        random_transaction(&mut rng, DEV.chain_id, 2_000_000_000),
        random_blob_transaction(&mut rng, DEV.chain_id, 2, 1_000),
        random_blob_transaction(&mut rng, DEV.chain_id, 1, 1_000),
    ]);
    let (node, tree) = launch_node(DEV.clone(), pool.clone());
    let api = &node.engine_api;

    let genesis = tree.head();
    let beacon_root = B256::repeat_byte(0xbe);
    let state = ForkchoiceState { head_block_hash: genesis.hash(), ..Default::default() };
    let updated = api
        .fork_choice_updated_v3(state, Some(attributes(&genesis, Some(beacon_root))))
        .await
        .unwrap();
    assert!(updated.is_valid());
    let id = updated.payload_id.unwrap();

    wait_for_transactions(&node, id, 3).await;

    let envelope = api.get_payload_v3(id).unwrap();
    assert_eq!(envelope.blobs_bundle.blobs.len(), 3);
    assert_eq!(envelope.blobs_bundle.commitments.len(), 3);
    assert_eq!(envelope.blobs_bundle.proofs.len(), 3);

    // resolving again serves the same payload
    assert_eq!(api.get_payload_v3(id).unwrap(), envelope);
    // a cancun payload is not served by the shanghai method
    let err = api.get_payload_v2(id).unwrap_err();
    assert_eq!(err.code(), UNSUPPORTED_FORK_CODE);

    let payload = envelope.execution_payload;
    let block_hash = payload.payload_inner.payload_inner.block_hash;
    let hashes = versioned_hashes(&pool, &payload.payload_inner.payload_inner.transactions);
    assert_eq!(hashes.len(), 3);

    let mut reordered = hashes.clone();
    reordered.swap(0, 2);
    let status = api.new_payload_v3(payload.clone(), reordered, beacon_root).await.unwrap();
    assert!(status.is_invalid());

    let status = api.new_payload_v3(payload, hashes, beacon_root).await.unwrap();
    assert!(status.is_valid());
    assert_eq!(status.latest_valid_hash, Some(block_hash));

    let state = ForkchoiceState { head_block_hash: block_hash, ..Default::default() };
    let updated = api.fork_choice_updated_v3(state, None).await.unwrap();
    assert!(updated.is_valid());
    assert_eq!(tree.head().hash(), block_hash);
}

#[tokio::test(flavor = "multi_thread")]
async fn build_and_import_over_json_rpc() {
    let mut rng = generators::rng();
    let chain_spec = Arc::new(
        ChainSpecBuilder::mainnet()
            .genesis_gas_limit(ETHEREUM_BLOCK_GAS_LIMIT)
            .shanghai_activated()
            .build(),
    );

    let pool = MockTransactionSource::default();
    pool.add(random_transaction(&mut rng, chain_spec.chain_id, 1_000_000_000));
    let (node, tree) = launch_node(chain_spec, pool);
    let api = &node.engine_api;

    let genesis = tree.head();
    let state = ForkchoiceState { head_block_hash: genesis.hash(), ..Default::default() };
    let res = api
        .call("engine_forkchoiceUpdatedV2", json!([state, attributes(&genesis, None)]))
        .await
        .unwrap();
    let updated: ForkchoiceUpdated = serde_json::from_value(res).unwrap();
    let id = updated.payload_id.unwrap();

    wait_for_transactions(&node, id, 1).await;

    // V3 methods are not served before cancun
    let err = api.call("engine_getPayloadV3", json!([id])).await.unwrap_err();
    assert_matches!(err, EngineApiError::EngineObjectValidationError(_));
    assert_eq!(err.code(), UNSUPPORTED_FORK_CODE);

    let res = api.call("engine_getPayloadV2", json!([id])).await.unwrap();
    let envelope: ExecutionPayloadEnvelopeV2 = serde_json::from_value(res.clone()).unwrap();
    let block_hash = envelope.execution_payload.into_v1_payload().block_hash;

    let res = api.call("engine_newPayloadV2", json!([res["executionPayload"]])).await.unwrap();
    let status: PayloadStatus = serde_json::from_value(res).unwrap();
    assert!(status.is_valid());
    assert_eq!(status.latest_valid_hash, Some(block_hash));

    let state = ForkchoiceState { head_block_hash: block_hash, ..Default::default() };
    let res = api.call("engine_forkchoiceUpdatedV2", json!([state, null])).await.unwrap();
    let updated: ForkchoiceUpdated = serde_json::from_value(res).unwrap();
    assert!(updated.is_valid());
    assert_eq!(updated.payload_id, None);

    let res = api.call("engine_getPayloadBodiesByRangeV1", json!(["0x1", "0x10"])).await.unwrap();
    let bodies = res.as_array().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["transactions"].as_array().unwrap().len(), 1);
}

//! Node setup tests.

use alloy_rlp::Encodable;
use assert_matches::assert_matches;
use ember_chainspec::DEV;
use ember_config::{Config, GcMode};
use ember_interfaces::test_utils::{MockBlockTree, MockExecutor, MockTransactionSource};
use ember_node_builder::{
    components::{BuilderContext, EthereumPayloadServiceBuilder, PayloadServiceBuilder},
    EngineNodeBuilder,
};
use ember_payload_builder::{GcControl, PayloadBuilderHandle};
use ember_primitives::{Address, B256};
use ember_rpc_types::engine::{ForkchoiceState, PayloadAttributes, PayloadId};
use ember_tasks::{TaskManager, TokioTaskExecutor};
use std::time::Duration;

fn attributes(timestamp: u64) -> PayloadAttributes {
    PayloadAttributes {
        timestamp,
        prev_randao: B256::repeat_byte(0x01),
        suggested_fee_recipient: Address::repeat_byte(0x02),
        withdrawals: Some(vec![]),
        parent_beacon_block_root: Some(B256::repeat_byte(0x03)),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn launch_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ember.toml");

    let mut config = Config::default();
    config.gc.mode = GcMode::NoOp;
    config.cache.capacity = 4;
    config.builder.extra_data = "ember-test".to_string();
    config.save(&path).unwrap();

    let config = Config::load(&path).unwrap();
    let tree = MockBlockTree::with_chain_spec(&DEV);
    let node = EngineNodeBuilder::new(config, DEV.clone())
        .with_tree(tree.clone())
        .with_executor(MockExecutor::default())
        .with_pool(MockTransactionSource::default())
        .launch(TokioTaskExecutor::default())
        .unwrap();

    assert_matches!(node.gc, GcControl::NoOp);
    assert_eq!(node.config.cache.capacity, 4);

    let head = tree.head();
    let state = ForkchoiceState { head_block_hash: head.hash(), ..Default::default() };
    let updated = node
        .engine_api
        .fork_choice_updated_v3(state, Some(attributes(head.timestamp + 12)))
        .await
        .unwrap();
    let id = updated.payload_id.unwrap();

    let mut extra_data = Vec::new();
    "ember-test".as_bytes().encode(&mut extra_data);
    let payload = node.payload_store().best_payload(id).unwrap();
    assert_eq!(payload.block().extra_data.as_ref(), extra_data.as_slice());
    assert_eq!(payload.block().parent_hash, head.hash());
}

#[tokio::test]
async fn rejects_invalid_config() {
    let mut config = Config::default();
    config.cache.capacity = 0;

    let res = EngineNodeBuilder::new(config, DEV.clone())
        .with_tree(MockBlockTree::with_chain_spec(&DEV))
        .with_executor(MockExecutor::default())
        .with_pool(MockTransactionSource::default())
        .launch(TokioTaskExecutor::default());
    assert!(res.is_err());
}

#[tokio::test]
async fn rejects_oversized_extra_data() {
    let mut config = Config::default();
    // fits the header raw, but not once encoded
    config.builder.extra_data = "x".repeat(32);

    let res = EngineNodeBuilder::new(config, DEV.clone())
        .with_tree(MockBlockTree::with_chain_spec(&DEV))
        .with_executor(MockExecutor::default())
        .with_pool(MockTransactionSource::default())
        .launch(TokioTaskExecutor::default());
    assert!(res.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn launch_on_task_manager() {
    let manager = TaskManager::current();
    let tree = MockBlockTree::with_chain_spec(&DEV);
    let node = EngineNodeBuilder::new(Config::default(), DEV.clone())
        .with_tree(tree.clone())
        .with_executor(MockExecutor::default())
        .with_pool(MockTransactionSource::default())
        .launch(manager.executor())
        .unwrap();
    assert_matches!(node.gc, GcControl::Suppressing(_));

    let head = tree.head();
    let state = ForkchoiceState { head_block_hash: head.hash(), ..Default::default() };
    let updated = node
        .engine_api
        .fork_choice_updated_v3(state, Some(attributes(head.timestamp + 12)))
        .await
        .unwrap();
    assert!(updated.payload_id.is_some());

    manager.graceful_shutdown();
    // the service is gone once the manager shut down
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = ForkchoiceState { head_block_hash: head.hash(), ..Default::default() };
    let res = node
        .engine_api
        .fork_choice_updated_v3(state, Some(attributes(head.timestamp + 24)))
        .await;
    assert!(res.is_err());
}

/// Spawns the default service after checking what the context carries.
fn checked_payload_service(
    ctx: &BuilderContext<MockBlockTree, MockExecutor, TokioTaskExecutor>,
    pool: MockTransactionSource,
) -> eyre::Result<PayloadBuilderHandle> {
    eyre::ensure!(ctx.chain_spec().chain_id == DEV.chain_id, "unexpected chain");
    eyre::ensure!(ctx.config().cache.capacity == 7, "unexpected cache capacity");
    EthereumPayloadServiceBuilder::default().spawn_payload_service(ctx, pool)
}

#[tokio::test]
async fn custom_payload_service() {
    let mut config = Config::default();
    config.cache.capacity = 7;

    let node = EngineNodeBuilder::new(config, DEV.clone())
        .with_tree(MockBlockTree::with_chain_spec(&DEV))
        .with_executor(MockExecutor::default())
        .with_pool(MockTransactionSource::default())
        .with_payload_service(checked_payload_service)
        .launch(TokioTaskExecutor::default())
        .unwrap();

    assert!(node.payload_builder.best_payload(PayloadId::new([0; 8])).is_none());

    let res = EngineNodeBuilder::new(Config::default(), DEV.clone())
        .with_tree(MockBlockTree::with_chain_spec(&DEV))
        .with_executor(MockExecutor::default())
        .with_pool(MockTransactionSource::default())
        .with_payload_service(checked_payload_service)
        .launch(TokioTaskExecutor::default());
    assert!(res.is_err());
}

//! A basic Ethereum payload builder implementation.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use ember_basic_payload_builder::{is_better_payload, BuildArguments, BuildOutcome, PayloadBuilder};
use ember_chainspec::ChainSpec;
use ember_interfaces::{
    executor::{BlockExecutionError, BlockExecutor},
    transaction_pool::{PendingTransaction, TransactionSource},
};
use ember_payload_builder::{error::PayloadBuilderError, BuiltPayload, PayloadBuilderAttributes};
use ember_primitives::{
    constants::{eip4844::MAX_BLOBS_PER_BLOCK, EIP1559_INITIAL_BASE_FEE},
    eip4844::calc_blob_gasprice,
    proofs::{calculate_transaction_root, calculate_withdrawals_root},
    Block, Bytes, Header, SealedHeader, U256,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

mod config;
pub use config::{calculate_block_gas_limit, EthereumBuilderConfig};

/// Ethereum payload builder
#[derive(Debug, Clone)]
pub struct EthereumPayloadBuilder<Exec, Pool> {
    /// The chain spec.
    chain_spec: Arc<ChainSpec>,
    /// Executes built blocks.
    executor: Exec,
    /// The transactions to build blocks from.
    pool: Pool,
    /// Payload builder configuration.
    builder_config: EthereumBuilderConfig,
}

impl<Exec, Pool> EthereumPayloadBuilder<Exec, Pool> {
    /// `EthereumPayloadBuilder` constructor.
    pub const fn new(
        chain_spec: Arc<ChainSpec>,
        executor: Exec,
        pool: Pool,
        builder_config: EthereumBuilderConfig,
    ) -> Self {
        Self { chain_spec, executor, pool, builder_config }
    }
}

impl<Exec, Pool> EthereumPayloadBuilder<Exec, Pool>
where
    Exec: BlockExecutor,
    Pool: TransactionSource,
{
    /// Returns the header fields of the next block, without post-state.
    fn block_env(
        &self,
        parent: &SealedHeader,
        attributes: &PayloadBuilderAttributes,
        extra_data: Bytes,
    ) -> BlockEnv {
        let shanghai = self.chain_spec.is_shanghai_active_at_timestamp(attributes.timestamp);
        let cancun = self.chain_spec.is_cancun_active_at_timestamp(attributes.timestamp);

        let base_fee =
            self.chain_spec.next_block_base_fee(parent).unwrap_or(EIP1559_INITIAL_BASE_FEE);
        // the first cancun block starts from zero excess blob gas
        let excess_blob_gas = cancun.then(|| parent.next_block_excess_blob_gas().unwrap_or_default());

        let header = Header {
            parent_hash: parent.hash(),
            beneficiary: attributes.suggested_fee_recipient,
            number: parent.number + 1,
            gas_limit: self.builder_config.gas_limit(parent.gas_limit),
            timestamp: attributes.timestamp,
            extra_data,
            mix_hash: attributes.prev_randao,
            base_fee_per_gas: Some(base_fee),
            withdrawals_root: shanghai.then(|| calculate_withdrawals_root(&attributes.withdrawals)),
            excess_blob_gas,
            parent_beacon_block_root: cancun
                .then(|| attributes.parent_beacon_block_root.unwrap_or_default()),
            ..Default::default()
        };

        BlockEnv { header, shanghai, cancun }
    }

    /// Picks the pending transactions that fit into the block, best first.
    fn select_transactions(
        &self,
        env: &BlockEnv,
        args: &BuildArguments,
    ) -> Vec<SelectedTransaction> {
        let base_fee = env.header.base_fee_per_gas.unwrap_or_default();
        let blob_gasprice = env.header.excess_blob_gas.map(calc_blob_gasprice);

        let mut cumulative_gas = 0u64;
        let mut blob_count = 0u64;
        let mut selected = Vec::new();

        for tx in self.pool.pending() {
            if args.is_expired() {
                trace!(target: "payload_builder", selected = selected.len(), "build deadline reached, stop selecting");
                break
            }

            // ensure we still have capacity for this transaction
            if cumulative_gas.saturating_add(tx.gas_limit) > env.header.gas_limit {
                trace!(target: "payload_builder", hash = %tx.hash, "skipping transaction exceeding the block gas limit");
                continue
            }

            let Some(tip) = tx.effective_tip_per_gas(base_fee) else {
                trace!(target: "payload_builder", hash = %tx.hash, base_fee, "skipping underpriced transaction");
                continue
            };

            if tx.is_blob() {
                let Some(blob_gasprice) = blob_gasprice else {
                    trace!(target: "payload_builder", hash = %tx.hash, "skipping blob transaction before cancun");
                    continue
                };
                if blob_count + tx.blob_count() as u64 > MAX_BLOBS_PER_BLOCK {
                    trace!(target: "payload_builder", hash = %tx.hash, "skipping blob transaction exceeding the blob limit");
                    continue
                }
                if tx.max_fee_per_blob_gas.unwrap_or_default() < blob_gasprice {
                    trace!(target: "payload_builder", hash = %tx.hash, blob_gasprice, "skipping blob transaction with insufficient blob fee");
                    continue
                }
                let consistent = tx
                    .sidecar
                    .as_ref()
                    .is_some_and(|sidecar| sidecar.matches_versioned_hashes(&tx.blob_versioned_hashes));
                if !consistent {
                    warn!(target: "payload_builder", hash = %tx.hash, "skipping blob transaction with inconsistent sidecar");
                    continue
                }
                blob_count += tx.blob_count() as u64;
            }

            cumulative_gas += tx.gas_limit;
            selected.push(SelectedTransaction { tip, tx });
        }

        selected
    }

    /// Executes the selected transactions and seals the block.
    ///
    /// Transactions that fail to execute are dropped and the rest is executed again.
    fn assemble(
        &self,
        parent: &SealedHeader,
        attributes: &PayloadBuilderAttributes,
        env: BlockEnv,
        mut selected: Vec<SelectedTransaction>,
    ) -> Result<BuiltPayload, PayloadBuilderError> {
        let BlockEnv { mut header, shanghai, cancun } = env;
        let withdrawals = shanghai.then(|| attributes.withdrawals.clone());

        let (block, outcome) = loop {
            let body = selected.iter().map(|s| s.tx.encoded.clone()).collect::<Vec<_>>();
            header.transactions_root = calculate_transaction_root(&body);
            header.blob_gas_used = cancun.then(|| {
                selected.iter().map(|s| s.tx.blob_gas()).sum::<u64>()
            });
            let block = Block { header: header.clone(), body, withdrawals: withdrawals.clone() };

            match self.executor.execute(parent, &block) {
                Ok(outcome) => break (block, outcome),
                Err(BlockExecutionError::Transaction { index, reason }) if index < selected.len() => {
                    let dropped = selected.remove(index);
                    debug!(target: "payload_builder", hash = %dropped.tx.hash, %reason, "dropping failed transaction");
                }
                Err(err) => return Err(err.into()),
            }
        };

        let fees = selected.iter().enumerate().fold(U256::ZERO, |fees, (index, s)| {
            fees + U256::from(s.tip) * U256::from(outcome.gas_used_by(index))
        });

        let Block { mut header, body, withdrawals } = block;
        header.state_root = outcome.state_root;
        header.receipts_root = outcome.receipts_root;
        header.logs_bloom = outcome.logs_bloom;
        header.gas_used = outcome.gas_used;

        let sealed = Block { header, body, withdrawals }.seal_slow();
        debug!(target: "payload_builder", id = %attributes.payload_id(), hash = %sealed.hash(), number = sealed.number, txs = sealed.body.len(), %fees, "sealed built block");

        let mut payload = BuiltPayload::new(attributes.payload_id(), sealed, fees);
        payload.extend_sidecars(selected.into_iter().filter_map(|s| s.tx.sidecar));
        Ok(payload)
    }
}

impl<Exec, Pool> PayloadBuilder for EthereumPayloadBuilder<Exec, Pool>
where
    Exec: BlockExecutor + Clone,
    Pool: TransactionSource + Clone,
{
    fn try_build(&self, args: BuildArguments) -> Result<BuildOutcome, PayloadBuilderError> {
        let parent = Arc::clone(&args.parent);
        debug!(target: "payload_builder", id = %args.attributes.payload_id(), parent_hash = %parent.hash(), parent_number = parent.number, "building new payload");

        let env = self.block_env(&parent, &args.attributes, args.extra_data.clone());
        let selected = self.select_transactions(&env, &args);
        let payload = self.assemble(&parent, &args.attributes, env, selected)?;

        // check if we have a better block
        if !is_better_payload(args.best_payload.as_deref(), payload.fees()) {
            // can skip building the block
            return Ok(BuildOutcome::Aborted { fees: payload.fees() })
        }

        Ok(BuildOutcome::Better(payload))
    }

    fn build_empty_payload(
        &self,
        parent: &SealedHeader,
        attributes: &PayloadBuilderAttributes,
        extra_data: Bytes,
    ) -> Result<BuiltPayload, PayloadBuilderError> {
        debug!(target: "payload_builder", id = %attributes.payload_id(), parent_hash = %parent.hash(), "building empty payload");
        let env = self.block_env(parent, attributes, extra_data);
        self.assemble(parent, attributes, env, Vec::new())
    }
}

/// The header of the next block before execution, and the forks active for it.
#[derive(Debug)]
struct BlockEnv {
    header: Header,
    shanghai: bool,
    cancun: bool,
}

/// A transaction picked for the block with the tip it pays per gas.
#[derive(Debug)]
struct SelectedTransaction {
    tip: u128,
    tx: PendingTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ember_chainspec::{ChainSpecBuilder, DEV};
    use ember_interfaces::test_utils::{
        generators::{self, random_blob_transaction, random_transaction},
        MockExecutor, MockTransactionSource, MOCK_TRANSACTION_GAS,
    };
    use ember_payload_builder::test_utils::{empty_payload, test_attributes};
    use ember_primitives::{
        constants::{eip4844::DATA_GAS_PER_BLOB, EMPTY_ROOT_HASH},
        B256,
    };
    use std::time::Duration;
    use tokio::time::Instant;

    const GWEI: u128 = 1_000_000_000;

    struct TestBuilder {
        builder: EthereumPayloadBuilder<MockExecutor, MockTransactionSource>,
        executor: MockExecutor,
        pool: MockTransactionSource,
        parent: Arc<SealedHeader>,
    }

    impl TestBuilder {
        fn new(chain_spec: Arc<ChainSpec>) -> Self {
            let executor = MockExecutor::default();
            let pool = MockTransactionSource::default();
            let parent = Arc::new(chain_spec.sealed_genesis_header());
            let builder = EthereumPayloadBuilder::new(
                chain_spec,
                executor.clone(),
                pool.clone(),
                EthereumBuilderConfig::new(),
            );
            Self { builder, executor, pool, parent }
        }

        fn args(&self) -> BuildArguments {
            BuildArguments {
                parent: Arc::clone(&self.parent),
                attributes: test_attributes(self.parent.hash(), self.parent.timestamp + 12),
                extra_data: Bytes::from_static(b"ember"),
                deadline: Instant::now() + Duration::from_secs(1),
                best_payload: None,
            }
        }

        fn build(&self) -> BuiltPayload {
            match self.builder.try_build(self.args()) {
                Ok(BuildOutcome::Better(payload)) => payload,
                res => panic!("expected a better payload, got {res:?}"),
            }
        }
    }

    #[test]
    fn builds_block_from_pending_transactions() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        let low = random_transaction(&mut rng, DEV.chain_id, GWEI);
        let high = random_transaction(&mut rng, DEV.chain_id, 2 * GWEI);
        test.pool.extend([high.clone(), low.clone()]);

        let payload = test.build();
        let block = payload.block();
        assert_eq!(block.body, vec![high.encoded, low.encoded]);
        assert_eq!(payload.fees(), U256::from(3 * GWEI * MOCK_TRANSACTION_GAS as u128));

        assert_eq!(block.parent_hash, test.parent.hash());
        assert_eq!(block.number, 1);
        assert_eq!(block.gas_used, 2 * MOCK_TRANSACTION_GAS);
        assert_eq!(block.extra_data, Bytes::from_static(b"ember"));
        assert_eq!(block.transactions_root, calculate_transaction_root(&block.body));
        assert_eq!(block.withdrawals_root, Some(EMPTY_ROOT_HASH));
        assert_eq!(block.blob_gas_used, Some(0));
        assert_eq!(block.excess_blob_gas, Some(0));
        assert_eq!(block.parent_beacon_block_root, Some(B256::ZERO));
        assert_eq!(block.base_fee_per_gas, DEV.next_block_base_fee(&test.parent));
        assert_eq!(block.hash(), block.header.header().hash_slow());
    }

    #[test]
    fn aborts_when_not_better_than_best_payload() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        test.pool.add(random_transaction(&mut rng, DEV.chain_id, GWEI));

        let mut args = test.args();
        let best = empty_payload(&args.attributes, U256::from(u128::MAX));
        args.best_payload = Some(Arc::new(best));

        assert_matches!(test.builder.try_build(args), Ok(BuildOutcome::Aborted { fees }) if fees > U256::ZERO);
    }

    #[test]
    fn drops_transactions_that_fail_to_execute() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        let failing = random_transaction(&mut rng, DEV.chain_id, 5 * GWEI);
        let ok = random_transaction(&mut rng, DEV.chain_id, GWEI);
        test.executor.fail_transaction(failing.hash);
        test.pool.extend([failing, ok.clone()]);

        let payload = test.build();
        assert_eq!(payload.block().body, vec![ok.encoded]);
        assert_eq!(payload.fees(), U256::from(GWEI * MOCK_TRANSACTION_GAS as u128));
    }

    #[test]
    fn skips_transactions_not_paying_the_base_fee() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        let mut cheap = random_transaction(&mut rng, DEV.chain_id, GWEI);
        cheap.max_fee_per_gas = 1;
        test.pool.add(cheap);

        assert!(test.build().block().body.is_empty());
    }

    #[test]
    fn includes_blob_transactions_with_sidecars_in_order() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        let first = random_blob_transaction(&mut rng, DEV.chain_id, 2, 1);
        let second = random_blob_transaction(&mut rng, DEV.chain_id, 1, 1);
        test.pool.extend([first.clone(), second.clone()]);

        let payload = test.build();
        assert_eq!(payload.block().body.len(), 2);
        assert_eq!(payload.block().blob_gas_used, Some(3 * DATA_GAS_PER_BLOB));
        assert_eq!(payload.sidecars(), [first.sidecar.unwrap(), second.sidecar.unwrap()]);

        let bundle = payload.into_v3_payload().blobs_bundle;
        assert_eq!(bundle.blobs.len(), 3);
        assert_eq!(bundle.commitments.len(), 3);
        assert_eq!(bundle.proofs.len(), 3);
    }

    #[test]
    fn respects_blob_limit_and_blob_fee() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        let four = random_blob_transaction(&mut rng, DEV.chain_id, 4, 1);
        let three = random_blob_transaction(&mut rng, DEV.chain_id, 3, 1);
        let underpriced = random_blob_transaction(&mut rng, DEV.chain_id, 1, 0);
        let two = random_blob_transaction(&mut rng, DEV.chain_id, 2, 1);
        test.pool.extend([four.clone(), three, underpriced, two.clone()]);

        let payload = test.build();
        assert_eq!(payload.block().body, vec![four.encoded, two.encoded]);
        assert_eq!(payload.block().blob_gas_used, Some(MAX_BLOBS_PER_BLOCK * DATA_GAS_PER_BLOB));
    }

    #[test]
    fn skips_blob_transaction_with_inconsistent_sidecar() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        let mut tx = random_blob_transaction(&mut rng, DEV.chain_id, 2, 1);
        tx.blob_versioned_hashes.reverse();
        test.pool.add(tx);

        let payload = test.build();
        assert!(payload.block().body.is_empty());
        assert!(payload.sidecars().is_empty());
    }

    #[test]
    fn blob_transactions_need_cancun() {
        let mut rng = generators::rng();
        let chain_spec = Arc::new(ChainSpecBuilder::mainnet().shanghai_activated().build());
        let test = TestBuilder::new(Arc::clone(&chain_spec));
        test.pool.add(random_blob_transaction(&mut rng, chain_spec.chain_id, 1, 1));

        let payload = test.build();
        assert!(payload.block().body.is_empty());
        assert_eq!(payload.block().blob_gas_used, None);
        assert_eq!(payload.block().parent_beacon_block_root, None);
        assert_eq!(payload.block().withdrawals_root, Some(EMPTY_ROOT_HASH));
    }

    #[test]
    fn stops_selecting_after_deadline() {
        let mut rng = generators::rng();
        let test = TestBuilder::new(DEV.clone());
        test.pool.add(random_transaction(&mut rng, DEV.chain_id, GWEI));

        let mut args = test.args();
        args.deadline = Instant::now();
        assert_matches!(
            test.builder.try_build(args),
            Ok(BuildOutcome::Better(payload)) if payload.block().body.is_empty()
        );
    }

    #[test]
    fn empty_payload_and_execution_failure() {
        let test = TestBuilder::new(DEV.clone());
        let args = test.args();

        let empty = test
            .builder
            .build_empty_payload(&test.parent, &args.attributes, Bytes::new())
            .unwrap();
        assert!(empty.block().body.is_empty());
        assert_eq!(empty.fees(), U256::ZERO);
        assert_eq!(empty.id(), args.attributes.payload_id());

        test.executor.set_missing_state(true);
        assert_matches!(
            test.builder.try_build(args),
            Err(PayloadBuilderError::Execution(BlockExecutionError::MissingParentState(_)))
        );
    }
}

use crate::executor::{BlockExecutionError, BlockExecutor, ExecutionOutcome, Receipt};
use ember_primitives::{keccak256, Block, SealedHeader, TxHash, B256};
use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc};

/// Gas every transaction consumes under the [`MockExecutor`].
pub const MOCK_TRANSACTION_GAS: u64 = 21_000;

/// A deterministic executor.
///
/// The post-state only depends on the parent state root and the block contents, so a block built
/// and later re-executed for validation arrives at the same roots.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    inner: Arc<Mutex<ExecutorState>>,
}

#[derive(Debug, Default)]
struct ExecutorState {
    failing: HashSet<TxHash>,
    missing_state: bool,
}

impl MockExecutor {
    /// Makes every transaction with the given hash fail.
    pub fn fail_transaction(&self, hash: TxHash) {
        self.inner.lock().failing.insert(hash);
    }

    /// Makes every execution fail with [`BlockExecutionError::MissingParentState`].
    pub fn set_missing_state(&self, missing: bool) {
        self.inner.lock().missing_state = missing;
    }
}

impl BlockExecutor for MockExecutor {
    fn execute(
        &self,
        parent: &SealedHeader,
        block: &Block,
    ) -> Result<ExecutionOutcome, BlockExecutionError> {
        let state = self.inner.lock();
        if state.missing_state {
            return Err(BlockExecutionError::MissingParentState(parent.hash()))
        }

        let mut receipts = Vec::with_capacity(block.body.len());
        let mut preimage = Vec::new();
        preimage.extend_from_slice(parent.state_root.as_slice());
        preimage.extend_from_slice(&block.number.to_be_bytes());
        preimage.extend_from_slice(block.beneficiary.as_slice());
        preimage.extend_from_slice(&block.timestamp.to_be_bytes());
        preimage.extend_from_slice(block.withdrawals_root.unwrap_or_default().as_slice());

        let mut gas_used = 0;
        for (index, tx) in block.body.iter().enumerate() {
            let hash = keccak256(tx);
            if state.failing.contains(&hash) {
                return Err(BlockExecutionError::Transaction {
                    index,
                    reason: format!("transaction {hash} reverted"),
                })
            }
            gas_used += MOCK_TRANSACTION_GAS;
            receipts.push(Receipt { success: true, cumulative_gas_used: gas_used });
            preimage.extend_from_slice(hash.as_slice());
        }

        let state_root = keccak256(&preimage);
        let mut receipts_preimage = state_root.to_vec();
        receipts_preimage.extend_from_slice(&gas_used.to_be_bytes());
        let receipts_root: B256 = keccak256(&receipts_preimage);

        Ok(ExecutionOutcome {
            state_root,
            receipts_root,
            logs_bloom: Default::default(),
            gas_used,
            receipts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{self, random_child_block};
    use assert_matches::assert_matches;
    use ember_chainspec::DEV;

    #[test]
    fn deterministic_outcome() {
        let mut rng = generators::rng();
        let genesis = DEV.sealed_genesis_header();
        let block = random_child_block(&mut rng, &genesis, 3).unseal();

        let executor = MockExecutor::default();
        let first = executor.execute(&genesis, &block).unwrap();
        let second = executor.execute(&genesis, &block).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.gas_used, 3 * MOCK_TRANSACTION_GAS);
        assert_eq!(first.gas_used_by(1), MOCK_TRANSACTION_GAS);
    }

    #[test]
    fn failing_transaction_reports_index() {
        let mut rng = generators::rng();
        let genesis = DEV.sealed_genesis_header();
        let block = random_child_block(&mut rng, &genesis, 3).unseal();

        let executor = MockExecutor::default();
        executor.fail_transaction(keccak256(&block.body[1]));
        let err = executor.execute(&genesis, &block).unwrap_err();
        assert_eq!(err.transaction_index(), Some(1));

        executor.set_missing_state(true);
        assert_matches!(
            executor.execute(&genesis, &block),
            Err(BlockExecutionError::MissingParentState(_))
        );
    }
}

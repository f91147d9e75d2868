use ember_primitives::{Block, Bloom, SealedHeader, B256};
use thiserror::Error;

/// A transaction receipt, reduced to what block validation compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Receipt {
    /// Whether the transaction succeeded.
    pub success: bool,
    /// Gas used by this and all preceding transactions of the block.
    pub cumulative_gas_used: u64,
}

/// The post-state of an executed block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    /// State root after the block.
    pub state_root: B256,
    /// Root of the receipts trie.
    pub receipts_root: B256,
    /// Bloom of all logs of the block.
    pub logs_bloom: Bloom,
    /// Total gas used by the block.
    pub gas_used: u64,
    /// One receipt per transaction, in order.
    pub receipts: Vec<Receipt>,
}

impl ExecutionOutcome {
    /// Gas used by the transaction at `index`.
    pub fn gas_used_by(&self, index: usize) -> u64 {
        let cumulative = self.receipts.get(index).map_or(0, |r| r.cumulative_gas_used);
        let previous = index
            .checked_sub(1)
            .and_then(|prev| self.receipts.get(prev))
            .map_or(0, |r| r.cumulative_gas_used);
        cumulative.saturating_sub(previous)
    }
}

/// Executes blocks on top of their parent's state.
#[auto_impl::auto_impl(&, Arc)]
pub trait BlockExecutor: Send + Sync {
    /// Executes the block on top of `parent` and returns the resulting post-state.
    ///
    /// The header's own post-state fields are ignored.
    fn execute(
        &self,
        parent: &SealedHeader,
        block: &Block,
    ) -> Result<ExecutionOutcome, BlockExecutionError>;
}

/// BlockExecutor Errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockExecutionError {
    /// A single transaction could not be executed.
    #[error("transaction {index} failed: {reason}")]
    Transaction {
        /// Position of the transaction in the block.
        index: usize,
        /// Why it failed.
        reason: String,
    },
    /// The parent state is not available.
    #[error("state for parent {0} is not available")]
    MissingParentState(B256),
    /// Fatal internal error
    #[error("fatal execution error: {0}")]
    Fatal(String),
}

impl BlockExecutionError {
    /// Returns the index of the failing transaction, if a single transaction failed.
    pub const fn transaction_index(&self) -> Option<usize> {
        match self {
            Self::Transaction { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_used_by_index() {
        let outcome = ExecutionOutcome {
            gas_used: 50_000,
            receipts: vec![
                Receipt { success: true, cumulative_gas_used: 21_000 },
                Receipt { success: false, cumulative_gas_used: 50_000 },
            ],
            ..Default::default()
        };
        assert_eq!(outcome.gas_used_by(0), 21_000);
        assert_eq!(outcome.gas_used_by(1), 29_000);
        assert_eq!(outcome.gas_used_by(2), 0);
    }
}

use ember_primitives::{BlockHash, BlockNumber};

/// Result alias for [`ProviderError`].
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned by the block tree.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ProviderError {
    /// The block hash is not known.
    #[error("block hash {block_hash} does not exist")]
    BlockHash {
        /// The unknown hash.
        block_hash: BlockHash,
    },
    /// The block number is not part of the canonical chain.
    #[error("block number {block_number} does not exist")]
    BlockNumber {
        /// The unknown number.
        block_number: BlockNumber,
    },
    /// The parent of an inserted block is not known.
    #[error("parent {parent_hash} of the inserted block is unknown")]
    UnknownParent {
        /// The unknown parent hash.
        parent_hash: BlockHash,
    },
    /// Any other storage failure.
    #[error("{0}")]
    Storage(String),
}

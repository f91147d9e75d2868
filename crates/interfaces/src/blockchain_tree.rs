use crate::provider::ProviderResult;
use ember_primitives::{BlockHash, BlockNumber, SealedBlock, SealedHeader};

/// Where an inserted block landed in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// The block extends the canonical head.
    Valid,
    /// The block was stored on a side chain.
    Accepted,
}

/// The block tree the engine validates payloads against and builds payloads on.
///
/// Storage and canonical chain selection live behind this trait.
#[auto_impl::auto_impl(&, Arc)]
pub trait BlockTree: Send + Sync {
    /// Returns the header of the current canonical head.
    fn canonical_head(&self) -> ProviderResult<SealedHeader>;

    /// Returns the header with the given hash, canonical or not.
    fn header_by_hash(&self, hash: BlockHash) -> ProviderResult<Option<SealedHeader>>;

    /// Returns the block with the given hash, canonical or not.
    fn block_by_hash(&self, hash: BlockHash) -> ProviderResult<Option<SealedBlock>>;

    /// Returns the canonical block with the given number.
    fn block_by_number(&self, number: BlockNumber) -> ProviderResult<Option<SealedBlock>>;

    /// Stores a validated and executed block.
    ///
    /// The parent must be known.
    fn insert_block(&self, block: SealedBlock) -> ProviderResult<BlockStatus>;

    /// Makes the block with the given hash the canonical head.
    fn make_canonical(&self, hash: BlockHash) -> ProviderResult<()>;
}

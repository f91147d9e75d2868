use crate::{
    blockchain_tree::{BlockStatus, BlockTree},
    provider::{ProviderError, ProviderResult},
};
use ember_chainspec::ChainSpec;
use ember_primitives::{BlockHash, BlockNumber, SealedBlock, SealedHeader};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

/// An in-memory block tree.
///
/// Blocks whose parent is the canonical head are reported as [`BlockStatus::Valid`], all others
/// as [`BlockStatus::Accepted`]. Inserting never moves the head, [`BlockTree::make_canonical`]
/// does.
#[derive(Debug, Clone)]
pub struct MockBlockTree {
    inner: Arc<RwLock<TreeState>>,
}

#[derive(Debug)]
struct TreeState {
    blocks: HashMap<BlockHash, SealedBlock>,
    canonical: BTreeMap<BlockNumber, BlockHash>,
    head: BlockHash,
}

impl MockBlockTree {
    /// Creates a tree containing only the given genesis header.
    pub fn new(genesis: SealedHeader) -> Self {
        let hash = genesis.hash();
        let withdrawals = genesis.withdrawals_root.map(|_| Vec::new());
        let block = SealedBlock { header: genesis, body: Vec::new(), withdrawals };
        let state = TreeState {
            blocks: HashMap::from([(hash, block)]),
            canonical: BTreeMap::from([(0, hash)]),
            head: hash,
        };
        Self { inner: Arc::new(RwLock::new(state)) }
    }

    /// Creates a tree starting at the genesis of the given chain.
    pub fn with_chain_spec(chain_spec: &ChainSpec) -> Self {
        Self::new(chain_spec.sealed_genesis_header())
    }

    /// Returns the canonical head.
    pub fn head(&self) -> SealedHeader {
        let state = self.inner.read();
        state.blocks[&state.head].header.clone()
    }

    /// Returns true if the tree contains a block with the given hash.
    pub fn contains(&self, hash: BlockHash) -> bool {
        self.inner.read().blocks.contains_key(&hash)
    }

    /// Inserts the block and makes it the canonical head.
    pub fn extend_canonical(&self, block: SealedBlock) {
        let hash = block.hash();
        let mut state = self.inner.write();
        state.blocks.insert(hash, block);
        state.set_head(hash);
    }
}

impl BlockTree for MockBlockTree {
    fn canonical_head(&self) -> ProviderResult<SealedHeader> {
        Ok(self.head())
    }

    fn header_by_hash(&self, hash: BlockHash) -> ProviderResult<Option<SealedHeader>> {
        Ok(self.inner.read().blocks.get(&hash).map(|block| block.header.clone()))
    }

    fn block_by_hash(&self, hash: BlockHash) -> ProviderResult<Option<SealedBlock>> {
        Ok(self.inner.read().blocks.get(&hash).cloned())
    }

    fn block_by_number(&self, number: BlockNumber) -> ProviderResult<Option<SealedBlock>> {
        let state = self.inner.read();
        Ok(state.canonical.get(&number).and_then(|hash| state.blocks.get(hash)).cloned())
    }

    fn insert_block(&self, block: SealedBlock) -> ProviderResult<BlockStatus> {
        let mut state = self.inner.write();
        if !state.blocks.contains_key(&block.parent_hash) {
            return Err(ProviderError::UnknownParent { parent_hash: block.parent_hash })
        }
        let status =
            if block.parent_hash == state.head { BlockStatus::Valid } else { BlockStatus::Accepted };
        state.blocks.insert(block.hash(), block);
        Ok(status)
    }

    fn make_canonical(&self, hash: BlockHash) -> ProviderResult<()> {
        let mut state = self.inner.write();
        if !state.blocks.contains_key(&hash) {
            return Err(ProviderError::BlockHash { block_hash: hash })
        }

        state.set_head(hash);
        Ok(())
    }
}

impl TreeState {
    /// Moves the head and rebuilds the canonical index by walking back through the parents.
    fn set_head(&mut self, hash: BlockHash) {
        let mut canonical = BTreeMap::new();
        let mut cursor = self.blocks.get(&hash);
        while let Some(block) = cursor {
            canonical.insert(block.number, block.hash());
            cursor = self.blocks.get(&block.parent_hash);
        }
        self.canonical = canonical;
        self.head = hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{self, random_child_block};
    use assert_matches::assert_matches;
    use ember_chainspec::DEV;

    #[test]
    fn insert_and_reorg() {
        let mut rng = generators::rng();
        let tree = MockBlockTree::with_chain_spec(&DEV);
        let genesis = tree.head();

        let a = random_child_block(&mut rng, &genesis, 1);
        let b = random_child_block(&mut rng, &genesis, 2);
        assert_eq!(tree.insert_block(a.clone()).unwrap(), BlockStatus::Valid);
        assert_eq!(tree.insert_block(b.clone()).unwrap(), BlockStatus::Valid);

        tree.make_canonical(a.hash()).unwrap();
        assert_eq!(tree.block_by_number(1).unwrap().map(|b| b.hash()), Some(a.hash()));

        let c = random_child_block(&mut rng, &genesis, 0);
        assert_eq!(tree.insert_block(c).unwrap(), BlockStatus::Accepted);

        tree.make_canonical(b.hash()).unwrap();
        assert_eq!(tree.head().hash(), b.hash());
        assert_eq!(tree.block_by_number(1).unwrap().map(|b| b.hash()), Some(b.hash()));
        assert!(tree.block_by_hash(a.hash()).unwrap().is_some());
    }

    #[test]
    fn unknown_blocks() {
        let mut rng = generators::rng();
        let tree = MockBlockTree::with_chain_spec(&DEV);
        let orphan_parent = random_child_block(&mut rng, &tree.head(), 0);
        let orphan = random_child_block(&mut rng, &orphan_parent.header, 0);

        assert_matches!(tree.insert_block(orphan.clone()), Err(ProviderError::UnknownParent { .. }));
        assert_matches!(tree.make_canonical(orphan.hash()), Err(ProviderError::BlockHash { .. }));
        assert!(tree.block_by_number(5).unwrap().is_none());
    }
}

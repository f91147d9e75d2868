//! Generators for random test data.

use crate::{test_utils::MOCK_TRANSACTION_GAS, transaction_pool::PendingTransaction};
use ember_primitives::{
    eip4844::kzg_to_versioned_hash,
    proofs::calculate_transaction_root,
    test_utils::{encode_blob_transaction, encode_eip1559_transaction},
    keccak256, Address, BlobTransactionSidecar, Block, Bytes, Bytes48, Header, SealedBlock,
    SealedHeader, B256,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Returns a rng seeded from the `SEED` environment variable, or a random seed which is printed.
pub fn rng() -> StdRng {
    let seed = std::env::var("SEED")
        .ok()
        .and_then(|seed| seed.parse::<u64>().ok())
        .unwrap_or_else(|| rand::thread_rng().gen());
    eprintln!("test rng seed: {seed}");
    StdRng::seed_from_u64(seed)
}

fn random_b256<R: Rng>(rng: &mut R) -> B256 {
    B256::from(rng.gen::<[u8; 32]>())
}

fn random_bytes48<R: Rng>(rng: &mut R) -> Bytes48 {
    let mut bytes = [0u8; 48];
    rng.fill(&mut bytes[..]);
    Bytes48::from(bytes)
}

/// Generates a dynamic fee transaction paying the given tip and a generous fee cap.
pub fn random_transaction<R: Rng>(
    rng: &mut R,
    chain_id: u64,
    max_priority_fee_per_gas: u128,
) -> PendingTransaction {
    let encoded = encode_eip1559_transaction(chain_id, rng.gen());
    PendingTransaction {
        hash: keccak256(&encoded),
        encoded,
        gas_limit: MOCK_TRANSACTION_GAS,
        max_fee_per_gas: 100_000_000_000,
        max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
        max_fee_per_blob_gas: None,
        blob_versioned_hashes: Vec::new(),
        sidecar: None,
    }
}

/// Generates a sidecar with `blob_count` placeholder blobs and random commitments.
pub fn random_sidecar<R: Rng>(rng: &mut R, blob_count: usize) -> BlobTransactionSidecar {
    let blobs = (0..blob_count).map(|_| Bytes::from(rng.gen::<[u8; 32]>().to_vec())).collect();
    let commitments = (0..blob_count).map(|_| random_bytes48(rng)).collect();
    let proofs = (0..blob_count).map(|_| random_bytes48(rng)).collect();
    BlobTransactionSidecar::new(blobs, commitments, proofs)
}

/// Generates a blob transaction with a matching sidecar.
pub fn random_blob_transaction<R: Rng>(
    rng: &mut R,
    chain_id: u64,
    blob_count: usize,
    max_fee_per_blob_gas: u128,
) -> PendingTransaction {
    let sidecar = random_sidecar(rng, blob_count);
    let blob_versioned_hashes = sidecar
        .commitments
        .iter()
        .map(|commitment| kzg_to_versioned_hash(commitment.as_slice()))
        .collect::<Vec<_>>();
    let encoded = encode_blob_transaction(chain_id, rng.gen(), &blob_versioned_hashes);
    PendingTransaction {
        hash: keccak256(&encoded),
        encoded,
        gas_limit: MOCK_TRANSACTION_GAS,
        max_fee_per_gas: 100_000_000_000,
        max_priority_fee_per_gas: Some(1_000_000_000),
        max_fee_per_blob_gas: Some(max_fee_per_blob_gas),
        blob_versioned_hashes,
        sidecar: Some(sidecar),
    }
}

/// Generates a block on top of `parent` with `tx_count` random transactions.
///
/// The post-state fields are random, the block is only structurally valid.
pub fn random_child_block<R: Rng>(
    rng: &mut R,
    parent: &SealedHeader,
    tx_count: usize,
) -> SealedBlock {
    let body = (0..tx_count)
        .map(|_| encode_eip1559_transaction(1, rng.gen()))
        .collect::<Vec<_>>();
    let header = Header {
        parent_hash: parent.hash(),
        number: parent.number + 1,
        timestamp: parent.timestamp + 12,
        gas_limit: parent.gas_limit,
        gas_used: tx_count as u64 * MOCK_TRANSACTION_GAS,
        beneficiary: Address::from(rng.gen::<[u8; 20]>()),
        state_root: random_b256(rng),
        receipts_root: random_b256(rng),
        mix_hash: random_b256(rng),
        transactions_root: calculate_transaction_root(&body),
        base_fee_per_gas: parent.base_fee_per_gas,
        withdrawals_root: parent.withdrawals_root,
        blob_gas_used: parent.blob_gas_used.map(|_| 0),
        excess_blob_gas: parent.excess_blob_gas.map(|_| 0),
        parent_beacon_block_root: parent.parent_beacon_block_root.map(|_| random_b256(rng)),
        ..Default::default()
    };
    let withdrawals = header.withdrawals_root.map(|_| Vec::new());
    Block { header, body, withdrawals }.seal_slow()
}

/// Generates a chain of `len` blocks on top of `parent`, each with `tx_count` transactions.
pub fn random_chain<R: Rng>(
    rng: &mut R,
    parent: &SealedHeader,
    len: usize,
    tx_count: usize,
) -> Vec<SealedBlock> {
    let mut blocks: Vec<SealedBlock> = Vec::with_capacity(len);
    for _ in 0..len {
        let parent = blocks.last().map_or(parent, |block| &block.header);
        let block = random_child_block(rng, parent, tx_count);
        blocks.push(block);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_chainspec::DEV;
    use ember_primitives::transaction::blob_versioned_hashes;

    #[test]
    fn blob_transaction_commits_to_sidecar() {
        let mut rng = rng();
        let tx = random_blob_transaction(&mut rng, 1337, 2, 10);
        let sidecar = tx.sidecar.as_ref().unwrap();
        assert!(sidecar.matches_versioned_hashes(&tx.blob_versioned_hashes));
        assert_eq!(blob_versioned_hashes(&tx.encoded).unwrap(), tx.blob_versioned_hashes);
        assert_eq!(tx.blob_count(), 2);
    }

    #[test]
    fn chain_links_parents() {
        let mut rng = rng();
        let genesis = DEV.sealed_genesis_header();
        let chain = random_chain(&mut rng, &genesis, 3, 1);
        assert_eq!(chain[0].parent_hash, genesis.hash());
        assert_eq!(chain[2].parent_hash, chain[1].hash());
        assert_eq!(chain[2].number, 3);
    }
}

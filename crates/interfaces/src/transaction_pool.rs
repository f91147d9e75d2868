use ember_primitives::{
    constants::eip4844::DATA_GAS_PER_BLOB, BlobTransactionSidecar, Bytes, TxHash, B256,
};

/// A transaction ready for inclusion, as handed to the payload builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Hash of the transaction.
    pub hash: TxHash,
    /// Canonical encoding, as it appears in a block.
    pub encoded: Bytes,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    /// Maximum fee per gas the sender pays.
    pub max_fee_per_gas: u128,
    /// Maximum priority fee per gas, `None` for transactions without a separate tip.
    pub max_priority_fee_per_gas: Option<u128>,
    /// Maximum fee per blob gas, set for blob transactions.
    pub max_fee_per_blob_gas: Option<u128>,
    /// Versioned hashes of the blobs the transaction commits to.
    pub blob_versioned_hashes: Vec<B256>,
    /// The blobs, commitments and proofs of a blob transaction.
    pub sidecar: Option<BlobTransactionSidecar>,
}

impl PendingTransaction {
    /// Returns the tip per gas the block producer receives at the given base fee, or `None` if the
    /// transaction can't pay the base fee.
    pub fn effective_tip_per_gas(&self, base_fee: u64) -> Option<u128> {
        let fee = self.max_fee_per_gas.checked_sub(base_fee as u128)?;
        Some(self.max_priority_fee_per_gas.map_or(fee, |tip| tip.min(fee)))
    }

    /// Returns true if this is a blob transaction.
    pub fn is_blob(&self) -> bool {
        self.max_fee_per_blob_gas.is_some()
    }

    /// Number of blobs the transaction carries.
    pub fn blob_count(&self) -> usize {
        self.blob_versioned_hashes.len()
    }

    /// Blob gas the transaction consumes.
    pub fn blob_gas(&self) -> u64 {
        self.blob_count() as u64 * DATA_GAS_PER_BLOB
    }
}

/// Supplies the transactions a payload is built from.
#[auto_impl::auto_impl(&, Arc)]
pub trait TransactionSource: Send + Sync {
    /// Returns the pending transactions, best first.
    fn pending(&self) -> Vec<PendingTransaction>;
}

use crate::{Bytes, Header, SealedHeader, Withdrawal, B256};
use std::ops::Deref;

/// Ethereum full block.
///
/// Transactions are kept in their canonical [EIP-2718](https://eips.ethereum.org/EIPS/eip-2718)
/// encoding, exactly as they are carried in an execution payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// Block header.
    pub header: Header,
    /// Canonical encodings of the transactions in this block.
    pub body: Vec<Bytes>,
    /// Withdrawals in the block, `None` before Shanghai.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl Block {
    /// Create SealedBlock that will create all header hashes.
    pub fn seal_slow(self) -> SealedBlock {
        SealedBlock {
            header: self.header.seal_slow(),
            body: self.body,
            withdrawals: self.withdrawals,
        }
    }

    /// Seal the block with a known hash.
    ///
    /// WARNING: This method does not perform validation whether the hash is correct.
    pub fn seal(self, hash: B256) -> SealedBlock {
        SealedBlock { header: self.header.seal(hash), body: self.body, withdrawals: self.withdrawals }
    }
}

impl Deref for Block {
    type Target = Header;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

/// Sealed Ethereum full block.
///
/// Withdrawals can be optionally included at the end of the RLP encoded message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SealedBlock {
    /// Locked block header.
    pub header: SealedHeader,
    /// Canonical encodings of the transactions in this block.
    pub body: Vec<Bytes>,
    /// Block withdrawals.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl SealedBlock {
    /// Header hash.
    pub const fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Splits the sealed block into underlying components
    pub fn split(self) -> (SealedHeader, Vec<Bytes>, Option<Vec<Withdrawal>>) {
        (self.header, self.body, self.withdrawals)
    }

    /// Unseal the block
    pub fn unseal(self) -> Block {
        Block { header: self.header.unseal(), body: self.body, withdrawals: self.withdrawals }
    }

    /// Returns only the transactions and withdrawals of the block.
    pub fn body_ref(&self) -> (&[Bytes], Option<&[Withdrawal]>) {
        (&self.body, self.withdrawals.as_deref())
    }
}

impl Deref for SealedBlock {
    type Target = SealedHeader;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_roundtrip_keeps_hash() {
        let block = Block {
            header: Header { number: 7, gas_limit: 30_000_000, ..Default::default() },
            body: vec![Bytes::from_static(&[0xc0])],
            withdrawals: Some(vec![]),
        };
        let sealed = block.clone().seal_slow();
        assert_eq!(sealed.hash(), block.header.hash_slow());
        assert_eq!(sealed.number, 7);
        assert_eq!(sealed.unseal(), block);
    }
}

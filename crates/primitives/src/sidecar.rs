use crate::{eip4844::kzg_to_versioned_hash, Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};

/// A KZG commitment or proof.
pub type Bytes48 = FixedBytes<48>;

/// The blobs, commitments and proofs that accompany a blob transaction on the network layer.
///
/// The sidecar never lands in a block; a block only carries the versioned hashes derived from the
/// commitments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlobTransactionSidecar {
    /// The blob data.
    pub blobs: Vec<Bytes>,
    /// The blob commitments.
    pub commitments: Vec<Bytes48>,
    /// The blob proofs.
    pub proofs: Vec<Bytes48>,
}

impl BlobTransactionSidecar {
    /// Creates a new sidecar from its parts.
    pub const fn new(blobs: Vec<Bytes>, commitments: Vec<Bytes48>, proofs: Vec<Bytes48>) -> Self {
        Self { blobs, commitments, proofs }
    }

    /// Number of blobs carried by this sidecar.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if the sidecar carries no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Versioned hashes of the commitments, in order.
    pub fn versioned_hashes(&self) -> impl Iterator<Item = B256> + '_ {
        self.commitments.iter().map(|commitment| kzg_to_versioned_hash(commitment.as_slice()))
    }

    /// Returns true if blobs, commitments and proofs line up one to one and the commitments hash
    /// to exactly the given versioned hashes.
    pub fn matches_versioned_hashes(&self, versioned_hashes: &[B256]) -> bool {
        self.blobs.len() == versioned_hashes.len() &&
            self.commitments.len() == versioned_hashes.len() &&
            self.proofs.len() == versioned_hashes.len() &&
            self.versioned_hashes().eq(versioned_hashes.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidecar(commitments: &[u8]) -> BlobTransactionSidecar {
        BlobTransactionSidecar::new(
            commitments.iter().map(|_| Bytes::from_static(&[0u8; 4])).collect(),
            commitments.iter().map(|b| Bytes48::repeat_byte(*b)).collect(),
            commitments.iter().map(|b| Bytes48::repeat_byte(b.wrapping_add(1))).collect(),
        )
    }

    #[test]
    fn matches_versioned_hashes_in_order() {
        let sidecar = sidecar(&[1, 2]);
        let hashes = sidecar.versioned_hashes().collect::<Vec<_>>();
        assert!(sidecar.matches_versioned_hashes(&hashes));

        let reversed = hashes.iter().rev().copied().collect::<Vec<_>>();
        assert!(!sidecar.matches_versioned_hashes(&reversed));
        assert!(!sidecar.matches_versioned_hashes(&hashes[..1]));
    }

    #[test]
    fn inconsistent_sidecar_never_matches() {
        let mut sidecar = sidecar(&[1, 2]);
        let hashes = sidecar.versioned_hashes().collect::<Vec<_>>();
        sidecar.proofs.pop();
        assert!(!sidecar.matches_versioned_hashes(&hashes));
    }
}

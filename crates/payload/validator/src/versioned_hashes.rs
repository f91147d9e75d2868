//! Cross-checks the blob versioned hashes supplied with `engine_newPayloadV3` against the hashes
//! the payload's transactions commit to.

use ember_primitives::{
    transaction::{TransactionEnvelope, TransactionEnvelopeError},
    Bytes, B256,
};

/// Errors of [`verify_versioned_hashes`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionedHashesError {
    /// A transaction could not be inspected.
    #[error("transaction {index}: {source}")]
    Transaction {
        /// Position of the transaction in the payload.
        index: usize,
        /// Why it could not be inspected.
        #[source]
        source: TransactionEnvelopeError,
    },
    /// The transactions commit to a different number of blobs than supplied.
    #[error("expected {expected} versioned hashes, got {supplied}")]
    LengthMismatch {
        /// Number of hashes committed to by the transactions.
        expected: usize,
        /// Number of supplied hashes.
        supplied: usize,
    },
    /// The hashes differ at `index`.
    #[error("versioned hash mismatch at index {index}: expected {expected}, got {supplied}")]
    Mismatch {
        /// Position of the first differing hash.
        index: usize,
        /// Hash committed to by the transactions.
        expected: B256,
        /// Supplied hash.
        supplied: B256,
    },
}

/// Returns the versioned hashes each transaction commits to, one list per transaction.
///
/// Fails on the first transaction that is not in its canonical form.
pub fn transaction_versioned_hashes(
    transactions: &[Bytes],
) -> Result<Vec<Vec<B256>>, VersionedHashesError> {
    transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| {
            TransactionEnvelope::decode(tx)
                .and_then(|envelope| envelope.blob_versioned_hashes())
                .map_err(|source| VersionedHashesError::Transaction { index, source })
        })
        .collect()
}

/// Verifies that `supplied` is exactly the concatenation of the per transaction hashes, in
/// transaction order.
pub fn verify_versioned_hashes<I, T>(supplied: &[B256], per_tx: I) -> Result<(), VersionedHashesError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[B256]>,
{
    let expected = per_tx.into_iter().fold(Vec::new(), |mut all, hashes| {
        all.extend_from_slice(hashes.as_ref());
        all
    });

    if expected.len() != supplied.len() {
        return Err(VersionedHashesError::LengthMismatch {
            expected: expected.len(),
            supplied: supplied.len(),
        })
    }

    if let Some((index, (expected, supplied))) =
        expected.iter().zip(supplied).enumerate().find(|(_, (expected, supplied))| expected != supplied)
    {
        return Err(VersionedHashesError::Mismatch {
            index,
            expected: *expected,
            supplied: *supplied,
        })
    }

    Ok(())
}

/// Returns true if `supplied` matches the hashes of the transactions, see
/// [`verify_versioned_hashes`].
pub fn matches_versioned_hashes<I, T>(supplied: &[B256], per_tx: I) -> bool
where
    I: IntoIterator<Item = T>,
    T: AsRef<[B256]>,
{
    verify_versioned_hashes(supplied, per_tx).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ember_primitives::test_utils::{
        encode_blob_transaction, encode_eip1559_transaction, encode_pooled_blob_transaction,
    };

    fn h(n: u8) -> B256 {
        B256::repeat_byte(n)
    }

    #[test]
    fn empty_matches_empty() {
        assert!(matches_versioned_hashes(&[], Vec::<Vec<B256>>::new()));
        assert!(matches_versioned_hashes(&[], [Vec::<B256>::new(), Vec::new()]));
    }

    #[test]
    fn exact_order_and_length() {
        let txs = [vec![h(0), h(1)]];
        assert!(matches_versioned_hashes(&[h(0), h(1)], &txs));

        assert_matches!(
            verify_versioned_hashes(&[h(0), h(1)], [vec![h(1), h(0)]]),
            Err(VersionedHashesError::Mismatch { index: 0, .. })
        );
        assert_matches!(
            verify_versioned_hashes(&[h(0), h(2)], [vec![h(0), h(1), h(2)]]),
            Err(VersionedHashesError::LengthMismatch { expected: 3, supplied: 2 })
        );
        assert_matches!(
            verify_versioned_hashes(&[h(0), h(1), h(2)], [vec![h(0), h(1)]]),
            Err(VersionedHashesError::LengthMismatch { expected: 2, supplied: 3 })
        );
    }

    #[test]
    fn concatenates_across_transactions() {
        let (a, b, c) = (h(0xa), h(0xb), h(0xc));
        let txs = [vec![a, b], vec![], vec![c]];
        assert!(matches_versioned_hashes(&[a, b, c], &txs));
        assert_matches!(
            verify_versioned_hashes(&[a, c, b], &txs),
            Err(VersionedHashesError::Mismatch { index: 1, expected, supplied }) if expected == b && supplied == c
        );
    }

    #[test]
    fn hashes_from_encoded_transactions() {
        let transactions = vec![
            encode_blob_transaction(1, 0, &[h(1), h(2)]),
            encode_eip1559_transaction(1, 1),
            encode_blob_transaction(1, 2, &[h(3)]),
        ];
        let per_tx = transaction_versioned_hashes(&transactions).unwrap();
        assert_eq!(per_tx, vec![vec![h(1), h(2)], vec![], vec![h(3)]]);
        assert!(matches_versioned_hashes(&[h(1), h(2), h(3)], &per_tx));
    }

    #[test]
    fn pooled_form_is_rejected() {
        let transactions = vec![
            encode_eip1559_transaction(1, 0),
            encode_pooled_blob_transaction(1, 1, &[h(1)]),
        ];
        assert_matches!(
            transaction_versioned_hashes(&transactions),
            Err(VersionedHashesError::Transaction {
                index: 1,
                source: TransactionEnvelopeError::PooledEncoding
            })
        );
    }
}

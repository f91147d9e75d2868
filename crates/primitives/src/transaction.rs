//! Inspection of canonical transaction encodings.
//!
//! The engine never decodes transactions fully: execution is delegated. It only needs to know the
//! type of a transaction, whether it is in the canonical (block) form, and which blob versioned
//! hashes a blob transaction commits to.

use crate::B256;
use alloy_rlp::{Decodable, Header};

/// Identifier for legacy transaction, however a legacy tx is technically not typed.
pub const LEGACY_TX_TYPE_ID: u8 = 0;

/// Identifier for an EIP-2930 transaction.
pub const EIP2930_TX_TYPE_ID: u8 = 1;

/// Identifier for an EIP-1559 transaction.
pub const EIP1559_TX_TYPE_ID: u8 = 2;

/// Identifier for an EIP-4844 transaction.
pub const EIP4844_TX_TYPE_ID: u8 = 3;

/// Position of `blob_versioned_hashes` in the field list of a canonical EIP-4844 transaction:
///
/// `[chain_id, nonce, max_priority_fee_per_gas, max_fee_per_gas, gas_limit, to, value, data,
/// access_list, max_fee_per_blob_gas, blob_versioned_hashes, y_parity, r, s]`
const BLOB_VERSIONED_HASHES_FIELD_INDEX: usize = 10;

/// Errors that can occur while inspecting a transaction encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionEnvelopeError {
    /// The encoding is empty.
    #[error("empty transaction encoding")]
    Empty,
    /// The type byte is not a known transaction type.
    #[error("unsupported transaction type {0:#04x}")]
    UnsupportedType(u8),
    /// A blob transaction in the network wrapper form that includes blobs, commitments and
    /// proofs. Only the canonical form is allowed inside a block.
    #[error("blob transaction in pooled network form")]
    PooledEncoding,
    /// Bytes remain after the transaction payload.
    #[error("unexpected trailing bytes after transaction payload")]
    TrailingBytes,
    /// Malformed RLP.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
}

/// A view over the canonical [EIP-2718](https://eips.ethereum.org/EIPS/eip-2718) encoding of a
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionEnvelope<'a> {
    tx_type: u8,
    /// The payload of the outer RLP list, without the list header.
    fields: &'a [u8],
}

impl<'a> TransactionEnvelope<'a> {
    /// Inspects the given canonical transaction encoding.
    ///
    /// Fails if the encoding is not a single well formed RLP list, optionally prefixed by a known
    /// type byte, or if a blob transaction is in its pooled network form.
    pub fn decode(raw: &'a [u8]) -> Result<Self, TransactionEnvelopeError> {
        let first = *raw.first().ok_or(TransactionEnvelopeError::Empty)?;

        let (tx_type, mut buf) = if first >= alloy_rlp::EMPTY_LIST_CODE {
            (LEGACY_TX_TYPE_ID, raw)
        } else if first <= 0x7f {
            (first, &raw[1..])
        } else {
            // an RLP string wrapping a typed transaction is the pre-2718 network encoding
            return Err(alloy_rlp::Error::UnexpectedString.into())
        };

        if !matches!(
            tx_type,
            LEGACY_TX_TYPE_ID | EIP2930_TX_TYPE_ID | EIP1559_TX_TYPE_ID | EIP4844_TX_TYPE_ID
        ) {
            return Err(TransactionEnvelopeError::UnsupportedType(tx_type))
        }

        let header = Header::decode(&mut buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString.into())
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort.into())
        }
        if buf.len() > header.payload_length {
            return Err(TransactionEnvelopeError::TrailingBytes)
        }
        let fields = &buf[..header.payload_length];

        // The canonical blob transaction starts with its chain id, the pooled form with the
        // nested transaction list.
        if tx_type == EIP4844_TX_TYPE_ID &&
            fields.first().is_some_and(|b| *b >= alloy_rlp::EMPTY_LIST_CODE)
        {
            return Err(TransactionEnvelopeError::PooledEncoding)
        }

        Ok(Self { tx_type, fields })
    }

    /// Returns the transaction type.
    pub const fn tx_type(&self) -> u8 {
        self.tx_type
    }

    /// Returns true if this is an EIP-4844 blob transaction.
    pub const fn is_blob(&self) -> bool {
        self.tx_type == EIP4844_TX_TYPE_ID
    }

    /// Returns the blob versioned hashes this transaction commits to, in order.
    ///
    /// Non-blob transactions commit to none.
    pub fn blob_versioned_hashes(&self) -> Result<Vec<B256>, TransactionEnvelopeError> {
        if !self.is_blob() {
            return Ok(Vec::new())
        }

        let mut buf = self.fields;
        for _ in 0..BLOB_VERSIONED_HASHES_FIELD_INDEX {
            skip_field(&mut buf)?;
        }
        Ok(Vec::<B256>::decode(&mut buf)?)
    }
}

/// Advances the buffer past the next RLP item.
fn skip_field(buf: &mut &[u8]) -> Result<(), TransactionEnvelopeError> {
    let header = Header::decode(buf)?;
    if buf.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort.into())
    }
    *buf = &buf[header.payload_length..];
    Ok(())
}

/// Returns the blob versioned hashes committed to by the given canonical transaction encoding.
pub fn blob_versioned_hashes(raw: &[u8]) -> Result<Vec<B256>, TransactionEnvelopeError> {
    TransactionEnvelope::decode(raw)?.blob_versioned_hashes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        encode_blob_transaction, encode_eip1559_transaction, encode_legacy_transaction,
        encode_pooled_blob_transaction,
    };
    use assert_matches::assert_matches;

    fn hashes(n: u8) -> Vec<B256> {
        (1..=n).map(B256::repeat_byte).collect()
    }

    #[test]
    fn legacy_and_dynamic_fee_have_no_blob_hashes() {
        let legacy = encode_legacy_transaction(0);
        let envelope = TransactionEnvelope::decode(&legacy).unwrap();
        assert_eq!(envelope.tx_type(), LEGACY_TX_TYPE_ID);
        assert!(envelope.blob_versioned_hashes().unwrap().is_empty());

        let dynamic = encode_eip1559_transaction(1, 0);
        let envelope = TransactionEnvelope::decode(&dynamic).unwrap();
        assert_eq!(envelope.tx_type(), EIP1559_TX_TYPE_ID);
        assert!(envelope.blob_versioned_hashes().unwrap().is_empty());
    }

    #[test]
    fn extracts_blob_hashes_in_order() {
        let expected = hashes(3);
        let tx = encode_blob_transaction(1, 7, &expected);
        let envelope = TransactionEnvelope::decode(&tx).unwrap();
        assert!(envelope.is_blob());
        assert_eq!(envelope.blob_versioned_hashes().unwrap(), expected);
        assert_eq!(blob_versioned_hashes(&tx).unwrap(), expected);
    }

    #[test]
    fn rejects_pooled_blob_transaction() {
        let tx = encode_pooled_blob_transaction(1, 0, &hashes(2));
        assert_matches!(TransactionEnvelope::decode(&tx), Err(TransactionEnvelopeError::PooledEncoding));
    }

    #[test]
    fn rejects_malformed_encodings() {
        assert_matches!(TransactionEnvelope::decode(&[]), Err(TransactionEnvelopeError::Empty));
        assert_matches!(
            TransactionEnvelope::decode(&[0x05, 0xc0]),
            Err(TransactionEnvelopeError::UnsupportedType(0x05))
        );
        assert_matches!(
            TransactionEnvelope::decode(&[0x82, 0x02, 0xc0]),
            Err(TransactionEnvelopeError::Rlp(_))
        );
        assert_matches!(
            TransactionEnvelope::decode(&[0x02, 0xc2, 0x01]),
            Err(TransactionEnvelopeError::Rlp(_))
        );

        let mut trailing = encode_eip1559_transaction(1, 0).to_vec();
        trailing.push(0x00);
        assert_matches!(
            TransactionEnvelope::decode(&trailing),
            Err(TransactionEnvelopeError::TrailingBytes)
        );
    }

    #[test]
    fn truncated_blob_fields() {
        // a blob transaction whose list ends before the versioned hashes
        let tx = [EIP4844_TX_TYPE_ID, 0xc2, 0x01, 0x02];
        let envelope = TransactionEnvelope::decode(&tx).unwrap();
        assert!(envelope.blob_versioned_hashes().is_err());
    }
}

//! Encoders for transactions in their canonical and network forms, for tests.
//!
//! The encodings carry fixed signature values and are not valid signed transactions; they are
//! only structurally correct.

use crate::{
    transaction::{EIP1559_TX_TYPE_ID, EIP4844_TX_TYPE_ID},
    Address, Bytes, B256, U256,
};
use alloy_rlp::{BufMut, Encodable};

const SIGNATURE_R: B256 = B256::repeat_byte(0x11);
const SIGNATURE_S: B256 = B256::repeat_byte(0x22);
const RECIPIENT: Address = Address::repeat_byte(0x42);

fn encode_fields(tx_type: Option<u8>, fields: &[&dyn Encodable]) -> Bytes {
    let payload_length = fields.iter().map(|field| field.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 4);
    if let Some(tx_type) = tx_type {
        out.put_u8(tx_type);
    }
    alloy_rlp::Header { list: true, payload_length }.encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out.into()
}

/// Encodes a legacy transaction with the given nonce.
pub fn encode_legacy_transaction(nonce: u64) -> Bytes {
    encode_fields(
        None,
        &[
            &nonce,
            &1_000_000_000u64,
            &21_000u64,
            &RECIPIENT,
            &U256::from(1),
            &Bytes::new(),
            &27u64,
            &U256::from_be_bytes(SIGNATURE_R.0),
            &U256::from_be_bytes(SIGNATURE_S.0),
        ],
    )
}

/// Encodes an EIP-1559 transaction with the given chain id and nonce.
pub fn encode_eip1559_transaction(chain_id: u64, nonce: u64) -> Bytes {
    encode_fields(
        Some(EIP1559_TX_TYPE_ID),
        &[
            &chain_id,
            &nonce,
            &1_000_000_000u64,
            &100_000_000_000u64,
            &21_000u64,
            &RECIPIENT,
            &U256::from(1),
            &Bytes::new(),
            &Vec::<B256>::new(),
            &0u64,
            &U256::from_be_bytes(SIGNATURE_R.0),
            &U256::from_be_bytes(SIGNATURE_S.0),
        ],
    )
}

fn blob_transaction_fields(chain_id: u64, nonce: u64, versioned_hashes: &[B256]) -> Bytes {
    let versioned_hashes = versioned_hashes.to_vec();
    encode_fields(
        None,
        &[
            &chain_id,
            &nonce,
            &1_000_000_000u64,
            &100_000_000_000u64,
            &21_000u64,
            &RECIPIENT,
            &U256::ZERO,
            &Bytes::new(),
            &Vec::<B256>::new(),
            &1_000_000u64,
            &versioned_hashes,
            &1u64,
            &U256::from_be_bytes(SIGNATURE_R.0),
            &U256::from_be_bytes(SIGNATURE_S.0),
        ],
    )
}

/// Encodes an EIP-4844 transaction in its canonical block form, committing to the given versioned
/// hashes.
pub fn encode_blob_transaction(chain_id: u64, nonce: u64, versioned_hashes: &[B256]) -> Bytes {
    let fields = blob_transaction_fields(chain_id, nonce, versioned_hashes);
    let mut out = Vec::with_capacity(fields.len() + 1);
    out.put_u8(EIP4844_TX_TYPE_ID);
    out.extend_from_slice(&fields);
    out.into()
}

/// Encodes an EIP-4844 transaction in its pooled network form, wrapping the transaction with one
/// placeholder blob, commitment and proof per versioned hash.
pub fn encode_pooled_blob_transaction(
    chain_id: u64,
    nonce: u64,
    versioned_hashes: &[B256],
) -> Bytes {
    let tx = RawRlp(blob_transaction_fields(chain_id, nonce, versioned_hashes));
    let blobs = vec![Bytes::from_static(&[0u8; 32]); versioned_hashes.len()];
    let commitments = vec![[0u8; 48]; versioned_hashes.len()];
    let proofs = vec![[0u8; 48]; versioned_hashes.len()];
    encode_fields(Some(EIP4844_TX_TYPE_ID), &[&tx, &blobs, &commitments, &proofs])
}

/// Already encoded RLP, written as is.
struct RawRlp(Bytes);

impl Encodable for RawRlp {
    fn encode(&self, out: &mut dyn BufMut) {
        out.put_slice(&self.0);
    }

    fn length(&self) -> usize {
        self.0.len()
    }
}

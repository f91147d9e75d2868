//! Commonly used types in ember.
//!
//! This crate contains the block level primitives the engine works with: headers, sealed blocks,
//! withdrawals, opaque transaction encodings and the fee math of EIP-1559 and EIP-4844.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod basefee;
mod block;
pub mod constants;
pub mod eip4844;
mod header;
pub mod proofs;
mod sidecar;
pub mod transaction;
mod withdrawal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use basefee::BaseFeeParams;
pub use block::{Block, SealedBlock};
pub use constants::{EMPTY_OMMER_ROOT_HASH, EMPTY_ROOT_HASH};
pub use header::{Header, SealedHeader};
pub use sidecar::{BlobTransactionSidecar, Bytes48};
pub use transaction::{TransactionEnvelope, TransactionEnvelopeError};
pub use withdrawal::Withdrawal;

pub use alloy_primitives::{
    self, address, b256, bytes, hex, keccak256, Address, BlockHash, BlockNumber, Bloom, Bytes,
    FixedBytes, TxHash, B256, B64, U256, U64,
};

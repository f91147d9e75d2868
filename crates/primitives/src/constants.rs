//! Ethereum protocol-related constants

use alloy_primitives::{b256, B256};
use std::time::Duration;

/// The client version: `ember/v{major}.{minor}.{patch}`
pub const EMBER_CLIENT_VERSION: &str = concat!("ember/v", env!("CARGO_PKG_VERSION"));

/// The duration of a slot after the merge.
pub const SLOT_DURATION: Duration = Duration::from_secs(12);

/// The maximum size of the `extra_data` header field.
pub const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;

/// The default block gas limit of mainnet blocks.
pub const ETHEREUM_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// The bound divisor of the gas limit, used in update calculations.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// The minimum gas limit a block can have.
pub const MINIMUM_GAS_LIMIT: u64 = 5000;

/// The minimum tx fee below which the txpool will reject the transaction.
///
/// Configured to `7` WEI which is the lowest possible value of base fee under mainnet EIP-1559
/// parameters. `BASE_FEE_MAX_CHANGE_DENOMINATOR` <https://eips.ethereum.org/EIPS/eip-1559>
/// is `8`, or 12.5%. Once the base fee has dropped to `7` WEI it cannot decrease further because
/// 12.5% of 7 is less than 1.
pub const MIN_PROTOCOL_BASE_FEE: u64 = 7;

/// Initial base fee as defined in [EIP-1559](https://eips.ethereum.org/EIPS/eip-1559)
pub const EIP1559_INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Base fee max change denominator as defined in [EIP-1559](https://eips.ethereum.org/EIPS/eip-1559)
pub const EIP1559_DEFAULT_BASE_FEE_MAX_CHANGE_DENOMINATOR: u64 = 8;

/// Elasticity multiplier as defined in [EIP-1559](https://eips.ethereum.org/EIPS/eip-1559)
pub const EIP1559_DEFAULT_ELASTICITY_MULTIPLIER: u64 = 2;

/// Multiplier for converting gwei to wei.
pub const GWEI_TO_WEI: u64 = 1_000_000_000;

/// Keccak-256 hash of the RLP of an empty list, KEC("\xc0").
pub const EMPTY_OMMER_ROOT_HASH: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// Root hash of an empty trie.
pub const EMPTY_ROOT_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Transactions root of an empty block.
pub const EMPTY_TRANSACTIONS: B256 = EMPTY_ROOT_HASH;

/// Receipts root of an empty block.
pub const EMPTY_RECEIPTS: B256 = EMPTY_ROOT_HASH;

/// Withdrawals root of a block without withdrawals.
pub const EMPTY_WITHDRAWALS: B256 = EMPTY_ROOT_HASH;

/// [EIP-4844](https://eips.ethereum.org/EIPS/eip-4844#parameters) constants.
pub mod eip4844 {
    /// Size a single field element in bytes.
    pub const FIELD_ELEMENT_BYTES: u64 = 32;

    /// How many field elements are stored in a single data blob.
    pub const FIELD_ELEMENTS_PER_BLOB: u64 = 4096;

    /// Gas consumption of a single data blob.
    pub const DATA_GAS_PER_BLOB: u64 = 131_072u64; // 32*4096 = 131072 == 2^17 == 0x20000

    /// Maximum data gas for data blobs in a single block.
    pub const MAX_DATA_GAS_PER_BLOCK: u64 = 786_432u64; // 0xC0000

    /// Target data gas for data blobs in a single block.
    pub const TARGET_DATA_GAS_PER_BLOCK: u64 = 393_216u64; // 0x60000

    /// Maximum number of data blobs in a single block.
    pub const MAX_BLOBS_PER_BLOCK: u64 = MAX_DATA_GAS_PER_BLOCK / DATA_GAS_PER_BLOB; // 786432 / 131072  = 6

    /// Target number of data blobs in a single block.
    pub const TARGET_BLOBS_PER_BLOCK: u64 = TARGET_DATA_GAS_PER_BLOCK / DATA_GAS_PER_BLOB; // 393216 / 131072 = 3

    /// Used to determine the price for next data blob
    pub const BLOB_GASPRICE_UPDATE_FRACTION: u128 = 3_338_477u128; // 3338477

    /// Minimum gas price for a data blob
    pub const BLOB_TX_MIN_BLOB_GASPRICE: u128 = 1u128;

    /// Commitment version of a KZG commitment
    pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

    /// Size of a blob in bytes.
    pub const BYTES_PER_BLOB: usize = (FIELD_ELEMENTS_PER_BLOB * FIELD_ELEMENT_BYTES) as usize;

    /// Size of a KZG commitment or proof in bytes.
    pub const BYTES_PER_COMMITMENT: usize = 48;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keccak256;

    #[test]
    fn empty_hashes() {
        assert_eq!(EMPTY_OMMER_ROOT_HASH, keccak256([alloy_rlp::EMPTY_LIST_CODE]));
        assert_eq!(EMPTY_ROOT_HASH, keccak256([alloy_rlp::EMPTY_STRING_CODE]));
    }

    #[test]
    fn max_blobs() {
        assert_eq!(eip4844::MAX_BLOBS_PER_BLOCK, 6);
        assert_eq!(eip4844::BYTES_PER_BLOB, 131_072);
    }
}

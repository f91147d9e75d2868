//! Helpers for working with EIP-4844 blob fee

use crate::constants::eip4844::{
    BLOB_GASPRICE_UPDATE_FRACTION, BLOB_TX_MIN_BLOB_GASPRICE, TARGET_DATA_GAS_PER_BLOCK,
    VERSIONED_HASH_VERSION_KZG,
};
use alloy_primitives::B256;
use sha2::{Digest, Sha256};

/// Calculates the excess data gas for the next block, after applying the current set of blobs on
/// top of the excess data gas.
///
/// Specified in [EIP-4844](https://eips.ethereum.org/EIPS/eip-4844#header-extension)
pub fn calculate_excess_blob_gas(parent_excess_blob_gas: u64, parent_blob_gas_used: u64) -> u64 {
    let excess_blob_gas = parent_excess_blob_gas + parent_blob_gas_used;
    excess_blob_gas.saturating_sub(TARGET_DATA_GAS_PER_BLOCK)
}

/// Calculates the blob gas price from the header's excess blob gas field.
///
/// See also [the EIP-4844 helpers](https://eips.ethereum.org/EIPS/eip-4844#helpers)
pub fn calc_blob_gasprice(excess_blob_gas: u64) -> u128 {
    fake_exponential(
        BLOB_TX_MIN_BLOB_GASPRICE,
        excess_blob_gas as u128,
        BLOB_GASPRICE_UPDATE_FRACTION,
    )
}

/// Approximates `factor * e ** (numerator / denominator)` using Taylor expansion.
///
/// # Panics
///
/// This function panics if `denominator` is zero.
pub fn fake_exponential(factor: u128, numerator: u128, denominator: u128) -> u128 {
    assert_ne!(denominator, 0, "attempt to divide by zero");

    let mut i = 1;
    let mut output = 0;
    let mut numerator_accum = factor * denominator;
    while numerator_accum > 0 {
        output += numerator_accum;

        // Denominator is asserted as not zero at the start of the function.
        numerator_accum = (numerator_accum * numerator) / (denominator * i);
        i += 1;
    }
    output / denominator
}

/// Calculates the versioned hash for a KZG commitment.
///
/// The hash is `sha256(commitment)` with its first byte replaced by the KZG version byte.
///
/// Specified in [EIP-4844](https://eips.ethereum.org/EIPS/eip-4844#header-extension)
pub fn kzg_to_versioned_hash(commitment: &[u8]) -> B256 {
    let mut res = Sha256::digest(commitment);
    res[0] = VERSIONED_HASH_VERSION_KZG;
    B256::from_slice(&res)
}

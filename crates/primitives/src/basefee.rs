//! Helpers for working with EIP-1559 base fee

use crate::constants::{
    EIP1559_DEFAULT_BASE_FEE_MAX_CHANGE_DENOMINATOR, EIP1559_DEFAULT_ELASTICITY_MULTIPLIER,
};
use serde::{Deserialize, Serialize};

/// BaseFeeParams contains the config parameters that control block base fee computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFeeParams {
    /// The base_fee_max_change_denominator from EIP-1559
    pub max_change_denominator: u64,
    /// The elasticity multiplier from EIP-1559
    pub elasticity_multiplier: u64,
}

impl BaseFeeParams {
    /// Get the base fee parameters for Ethereum mainnet
    pub const fn ethereum() -> Self {
        Self {
            max_change_denominator: EIP1559_DEFAULT_BASE_FEE_MAX_CHANGE_DENOMINATOR,
            elasticity_multiplier: EIP1559_DEFAULT_ELASTICITY_MULTIPLIER,
        }
    }
}

impl Default for BaseFeeParams {
    fn default() -> Self {
        Self::ethereum()
    }
}

/// Calculate the base fee for the next block based on the EIP-1559 specification.
///
/// The base fee increases when the parent block used more gas than its target (the gas limit
/// divided by the elasticity multiplier) and decreases when it used less. A congested parent
/// always raises the base fee by at least one wei.
///
/// For more information, refer to the [EIP-1559 spec](https://github.com/ethereum/EIPs/blob/master/EIPS/eip-1559.md).
pub fn calculate_next_block_base_fee(
    gas_used: u64,
    gas_limit: u64,
    base_fee: u64,
    base_fee_params: BaseFeeParams,
) -> u64 {
    let gas_target = gas_limit / base_fee_params.elasticity_multiplier;
    if gas_target == 0 || gas_used == gas_target {
        return base_fee
    }

    let base_fee_wide = base_fee as u128;
    let denominator = base_fee_params.max_change_denominator as u128;

    if gas_used > gas_target {
        let delta = (gas_used - gas_target) as u128;
        let increase = (base_fee_wide * delta / gas_target as u128 / denominator).max(1);
        base_fee.saturating_add(increase as u64)
    } else {
        let delta = (gas_target - gas_used) as u128;
        let decrease = base_fee_wide * delta / gas_target as u128 / denominator;
        base_fee.saturating_sub(decrease as u64)
    }
}

use ember_ethereum_forks::{ForkCondition, Hardfork};
use ember_primitives::{
    constants::{EIP1559_INITIAL_BASE_FEE, EMPTY_ROOT_HASH, ETHEREUM_BLOCK_GAS_LIMIT},
    BaseFeeParams, Header, SealedHeader, B256,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

/// The Ethereum mainnet fork schedule.
pub static MAINNET: Lazy<Arc<ChainSpec>> = Lazy::new(|| {
    ChainSpec {
        chain_id: 1,
        genesis_timestamp: 0,
        genesis_gas_limit: 5000,
        hardforks: BTreeMap::from([
            (Hardfork::Paris, ForkCondition::Block(15537394)),
            (Hardfork::Shanghai, ForkCondition::Timestamp(1681338455)),
            (Hardfork::Cancun, ForkCondition::Timestamp(1710338135)),
        ]),
        base_fee_params: BaseFeeParams::ethereum(),
    }
    .into()
});

/// A development chain with every fork active from genesis.
pub static DEV: Lazy<Arc<ChainSpec>> = Lazy::new(|| {
    ChainSpec {
        chain_id: 1337,
        genesis_timestamp: 0,
        genesis_gas_limit: ETHEREUM_BLOCK_GAS_LIMIT,
        hardforks: BTreeMap::from([
            (Hardfork::Paris, ForkCondition::Block(0)),
            (Hardfork::Shanghai, ForkCondition::Timestamp(0)),
            (Hardfork::Cancun, ForkCondition::Timestamp(0)),
        ]),
        base_fee_params: BaseFeeParams::ethereum(),
    }
    .into()
});

/// An Ethereum chain specification.
///
/// A chain specification describes:
///
/// - Meta-information about the chain (the chain ID)
/// - The parameters of the genesis block
/// - What hardforks are activated, and under which conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    /// The chain ID
    pub chain_id: u64,
    /// Timestamp of the genesis block.
    pub genesis_timestamp: u64,
    /// Gas limit of the genesis block.
    pub genesis_gas_limit: u64,
    /// The active hard forks and their activation conditions
    pub hardforks: BTreeMap<Hardfork, ForkCondition>,
    /// The parameters that configure how a block's base fee is computed
    pub base_fee_params: BaseFeeParams,
}

impl ChainSpec {
    /// Returns a builder starting from the mainnet schedule.
    pub fn builder() -> ChainSpecBuilder {
        ChainSpecBuilder::mainnet()
    }

    /// Get the fork condition for the given fork.
    pub fn fork(&self, fork: Hardfork) -> ForkCondition {
        self.hardforks.get(&fork).copied().unwrap_or(ForkCondition::Never)
    }

    /// Get an iterator of all hardforks with their respective activation conditions.
    pub fn forks_iter(&self) -> impl Iterator<Item = (Hardfork, ForkCondition)> + '_ {
        self.hardforks.iter().map(|(f, b)| (*f, *b))
    }

    /// Convenience method to check if a fork is active at a given timestamp.
    pub fn is_fork_active_at_timestamp(&self, fork: Hardfork, timestamp: u64) -> bool {
        self.fork(fork).active_at_timestamp(timestamp)
    }

    /// Convenience method to check if [`Hardfork::Shanghai`] is active at a given timestamp.
    pub fn is_shanghai_active_at_timestamp(&self, timestamp: u64) -> bool {
        self.is_fork_active_at_timestamp(Hardfork::Shanghai, timestamp)
    }

    /// Convenience method to check if [`Hardfork::Cancun`] is active at a given timestamp.
    pub fn is_cancun_active_at_timestamp(&self, timestamp: u64) -> bool {
        self.is_fork_active_at_timestamp(Hardfork::Cancun, timestamp)
    }

    /// Returns the latest fork active at the given timestamp.
    ///
    /// Every block the engine deals with is post-merge, so [`Hardfork::Paris`] is the floor. The
    /// result is monotonic in the timestamp.
    pub fn fork_at_timestamp(&self, timestamp: u64) -> Hardfork {
        if self.is_cancun_active_at_timestamp(timestamp) {
            Hardfork::Cancun
        } else if self.is_shanghai_active_at_timestamp(timestamp) {
            Hardfork::Shanghai
        } else {
            Hardfork::Paris
        }
    }

    /// Get the header for the genesis block, with the fork specific fields of the forks active at
    /// the genesis timestamp.
    pub fn genesis_header(&self) -> Header {
        let shanghai = self.is_shanghai_active_at_timestamp(self.genesis_timestamp);
        let cancun = self.is_cancun_active_at_timestamp(self.genesis_timestamp);
        Header {
            number: 0,
            timestamp: self.genesis_timestamp,
            gas_limit: self.genesis_gas_limit,
            base_fee_per_gas: Some(EIP1559_INITIAL_BASE_FEE),
            withdrawals_root: shanghai.then_some(EMPTY_ROOT_HASH),
            blob_gas_used: cancun.then_some(0),
            excess_blob_gas: cancun.then_some(0),
            parent_beacon_block_root: cancun.then_some(B256::ZERO),
            ..Default::default()
        }
    }

    /// Get the sealed header for the genesis block.
    pub fn sealed_genesis_header(&self) -> SealedHeader {
        self.genesis_header().seal_slow()
    }

    /// Calculates the base fee of the block following the given parent.
    pub fn next_block_base_fee(&self, parent: &Header) -> Option<u64> {
        parent.next_block_base_fee(self.base_fee_params)
    }
}

/// A helper to build custom chain specs
#[derive(Debug, Clone, Default)]
pub struct ChainSpecBuilder {
    chain_id: Option<u64>,
    genesis_timestamp: u64,
    genesis_gas_limit: Option<u64>,
    hardforks: BTreeMap<Hardfork, ForkCondition>,
    base_fee_params: BaseFeeParams,
}

impl ChainSpecBuilder {
    /// Construct a new builder from the mainnet chain spec.
    pub fn mainnet() -> Self {
        Self {
            chain_id: Some(MAINNET.chain_id),
            genesis_timestamp: MAINNET.genesis_timestamp,
            genesis_gas_limit: Some(MAINNET.genesis_gas_limit),
            hardforks: MAINNET.hardforks.clone(),
            base_fee_params: MAINNET.base_fee_params,
        }
    }

    /// Set the chain ID
    pub const fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the genesis timestamp.
    pub const fn genesis_timestamp(mut self, timestamp: u64) -> Self {
        self.genesis_timestamp = timestamp;
        self
    }

    /// Set the genesis gas limit.
    pub const fn genesis_gas_limit(mut self, gas_limit: u64) -> Self {
        self.genesis_gas_limit = Some(gas_limit);
        self
    }

    /// Set the base fee parameters.
    pub const fn base_fee_params(mut self, params: BaseFeeParams) -> Self {
        self.base_fee_params = params;
        self
    }

    /// Add the given fork with the given activation condition to the spec.
    pub fn with_fork(mut self, fork: Hardfork, condition: ForkCondition) -> Self {
        self.hardforks.insert(fork, condition);
        self
    }

    /// Remove the given fork from the spec.
    pub fn without_fork(mut self, fork: Hardfork) -> Self {
        self.hardforks.remove(&fork);
        self
    }

    /// Enable the Paris hardfork at genesis, and nothing after it.
    pub fn paris_activated(self) -> Self {
        self.with_fork(Hardfork::Paris, ForkCondition::Block(0))
            .without_fork(Hardfork::Shanghai)
            .without_fork(Hardfork::Cancun)
    }

    /// Enable Shanghai at genesis.
    pub fn shanghai_activated(self) -> Self {
        self.paris_activated().with_fork(Hardfork::Shanghai, ForkCondition::Timestamp(0))
    }

    /// Enable Cancun at genesis.
    pub fn cancun_activated(self) -> Self {
        self.shanghai_activated().with_fork(Hardfork::Cancun, ForkCondition::Timestamp(0))
    }

    /// Every supported fork active from genesis.
    pub fn all_active(self) -> Self {
        self.cancun_activated()
    }

    /// Activate Shanghai at the given timestamp.
    pub fn shanghai_at(self, timestamp: u64) -> Self {
        self.with_fork(Hardfork::Shanghai, ForkCondition::Timestamp(timestamp))
    }

    /// Activate Cancun at the given timestamp.
    pub fn cancun_at(self, timestamp: u64) -> Self {
        self.with_fork(Hardfork::Cancun, ForkCondition::Timestamp(timestamp))
    }

    /// Build the resulting [`ChainSpec`].
    ///
    /// Falls back to the mainnet chain id when none was set.
    pub fn build(self) -> ChainSpec {
        ChainSpec {
            chain_id: self.chain_id.unwrap_or(MAINNET.chain_id),
            genesis_timestamp: self.genesis_timestamp,
            genesis_gas_limit: self.genesis_gas_limit.unwrap_or(ETHEREUM_BLOCK_GAS_LIMIT),
            hardforks: self.hardforks,
            base_fee_params: self.base_fee_params,
        }
    }
}

impl From<&ChainSpec> for ChainSpecBuilder {
    fn from(value: &ChainSpec) -> Self {
        Self {
            chain_id: Some(value.chain_id),
            genesis_timestamp: value.genesis_timestamp,
            genesis_gas_limit: Some(value.genesis_gas_limit),
            hardforks: value.hardforks.clone(),
            base_fee_params: value.base_fee_params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_fork_at_timestamp() {
        assert_eq!(MAINNET.fork_at_timestamp(1681338454), Hardfork::Paris);
        assert_eq!(MAINNET.fork_at_timestamp(1681338455), Hardfork::Shanghai);
        assert_eq!(MAINNET.fork_at_timestamp(1710338134), Hardfork::Shanghai);
        assert_eq!(MAINNET.fork_at_timestamp(1710338135), Hardfork::Cancun);
        assert_eq!(MAINNET.fork_at_timestamp(u64::MAX), Hardfork::Cancun);
    }

    #[test]
    fn fork_at_timestamp_is_monotonic() {
        let spec = ChainSpecBuilder::mainnet().shanghai_at(100).cancun_at(200).build();
        let mut last = Hardfork::Paris;
        for timestamp in (0..400).step_by(7) {
            let fork = spec.fork_at_timestamp(timestamp);
            assert!(fork >= last);
            last = fork;
        }
        assert_eq!(last, Hardfork::Cancun);
    }

    #[test]
    fn builder_activations() {
        let paris = ChainSpecBuilder::mainnet().paris_activated().build();
        assert_eq!(paris.fork_at_timestamp(u64::MAX), Hardfork::Paris);
        assert_eq!(paris.fork(Hardfork::Cancun), ForkCondition::Never);

        let shanghai = ChainSpecBuilder::mainnet().shanghai_activated().build();
        assert_eq!(shanghai.fork_at_timestamp(0), Hardfork::Shanghai);

        let all = ChainSpecBuilder::default().all_active().chain_id(7).build();
        assert_eq!(all.fork_at_timestamp(0), Hardfork::Cancun);
        assert_eq!(all.chain_id, 7);
        assert_eq!(all.genesis_gas_limit, ETHEREUM_BLOCK_GAS_LIMIT);
    }

    #[test]
    fn genesis_header_carries_fork_fields() {
        let header = DEV.genesis_header();
        assert_eq!(header.withdrawals_root, Some(EMPTY_ROOT_HASH));
        assert_eq!(header.excess_blob_gas, Some(0));
        assert_eq!(header.parent_beacon_block_root, Some(B256::ZERO));

        let paris = ChainSpecBuilder::mainnet().paris_activated().build().genesis_header();
        assert_eq!(paris.withdrawals_root, None);
        assert_eq!(paris.blob_gas_used, None);
        assert_eq!(paris.base_fee_per_gas, Some(EIP1559_INITIAL_BASE_FEE));
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&**DEV).unwrap();
        let spec: ChainSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, **DEV);
    }
}

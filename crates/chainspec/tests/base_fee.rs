//! Base fee derivation through the chain spec.

use ember_chainspec::ChainSpecBuilder;
use ember_primitives::Header;

#[test]
fn test_next_block_base_fee() {
    let chain_spec = ChainSpecBuilder::mainnet().build();

    let mut parent = Header {
        gas_used: 20_000_000, // More than target (15M)
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(1_000_000_000),
        timestamp: 1_700_000_000,
        ..Default::default()
    };

    // Base fee should increase when block is more than half full
    let next_base_fee = chain_spec.next_block_base_fee(&parent).unwrap();
    assert!(next_base_fee > 1_000_000_000);

    // Base fee should decrease when block is less than half full
    parent.gas_used = 10_000_000;
    let next_base_fee = chain_spec.next_block_base_fee(&parent).unwrap();
    assert!(next_base_fee < 1_000_000_000);

    // Base fee stays the same when gas used is exactly the target
    parent.gas_used = parent.gas_limit / 2;
    let next_base_fee = chain_spec.next_block_base_fee(&parent).unwrap();
    assert_eq!(next_base_fee, 1_000_000_000);

    // No base fee before London
    parent.base_fee_per_gas = None;
    assert_eq!(chain_spec.next_block_base_fee(&parent), None);
}

//! Ember interface bindings
//!
//! The engine does not store chains, execute blocks or pool transactions itself. It is driven
//! against the collaborators defined here.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// Block tree traits.
pub mod blockchain_tree;

/// Block Execution traits.
pub mod executor;

/// Provider error
pub mod provider;

/// Source of transactions to build blocks from.
pub mod transaction_pool;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers for mocking out the block tree, the executor and the transaction source.
pub mod test_utils;

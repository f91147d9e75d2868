//! The chain specification: which forks activate when, and the chain parameters the engine
//! derives blocks with.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod spec;

pub use ember_ethereum_forks::{ForkCondition, Hardfork};
pub use spec::{ChainSpec, ChainSpecBuilder, DEV, MAINNET};

//! Ethereum fork types used in ember.
//!
//! The engine only distinguishes the proof-of-stake forks, since those are the ones the Engine API
//! is versioned by.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod forkcondition;
mod hardfork;

pub use forkcondition::ForkCondition;
pub use hardfork::Hardfork;

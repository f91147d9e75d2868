//! Ember RPC type definitions
//!
//! Provides the types exchanged over the Engine API, the interface a consensus client drives the
//! execution layer with.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod engine;

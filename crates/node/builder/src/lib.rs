//! Assembles an engine node.
//!
//! An [`EngineNode`] runs the payload builder service on a [`TaskSpawner`] and serves the engine
//! API on top of it. Its collaborators (the block tree, the block executor and the transaction
//! source) are handed to the [`EngineNodeBuilder`], every setting comes from the
//! [`Config`](ember_config::Config).
//!
//! [`TaskSpawner`]: ember_tasks::TaskSpawner

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod components;

mod builder;
pub use builder::EngineNodeBuilder;

mod node;
pub use node::EngineNode;

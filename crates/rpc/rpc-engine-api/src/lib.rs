//! The implementation of Engine API.
//! [Read more](https://github.com/ethereum/execution-apis/tree/main/src/engine).

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// The Engine API implementation.
mod engine_api;

/// Engine API error.
mod error;

/// Engine API metrics.
mod metrics;

pub use engine_api::{EngineApi, EngineMethod, CAPABILITIES, MAX_PAYLOAD_BODIES_LIMIT};
pub use error::*;

// re-export the message version for convenience
pub use ember_payload_primitives::EngineApiMessageVersion;

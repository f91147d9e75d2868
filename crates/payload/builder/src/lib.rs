//! This crate defines abstractions to create and update payloads (blocks):
//! - [`PayloadJobGenerator`]: a type that knows how to create new jobs that build payloads.
//! - [`PayloadJob`]: a type that yields (better) payloads over time.
//!
//! This crate comes with the generic [`PayloadBuilderService`] responsible for:
//!
//! - answering `engine_forkchoiceUpdated` requests that carry attributes once a first payload
//!   exists
//! - keeping built payloads in the [`PayloadCache`] until they expire
//! - superseding jobs whose parent is no longer the head
//!
//! ## Payload Building
//!
//! The [`PayloadBuilderService`] is only responsible for handling the lifecycle of payload jobs.
//! Building the first payload and improving it is left to the configured
//! [`PayloadJobGenerator`]. Improvements are published through the [`PayloadCache`], which only
//! ever replaces a payload with a strictly better one.
//!
//! `engine_getPayload` reads from the cache directly through the [`PayloadStore`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod cache;
pub mod error;
mod events;
pub mod gc;
mod metrics;
mod payload;
mod service;
mod traits;

pub use cache::{PayloadCache, PayloadCacheEntry, PayloadJobState, DEFAULT_PAYLOAD_CACHE_SIZE};
pub use error::PayloadBuilderError;
pub use events::{Events, PayloadEvents};
pub use gc::{GcControl, GcGuard};
pub use payload::{is_better_payload, payload_id, BuiltPayload, PayloadBuilderAttributes};
pub use service::{
    PayloadBuilderHandle, PayloadBuilderService, PayloadServiceCommand, PayloadServiceConfig,
    PayloadStore,
};
pub use traits::{FirstPayloadFuture, PayloadJob, PayloadJobGenerator};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ember_rpc_types::engine::PayloadId;

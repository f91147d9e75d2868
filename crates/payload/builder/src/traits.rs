//! Trait abstractions used by the payload crate.

use crate::{
    error::PayloadBuilderError, BuiltPayload, PayloadBuilderAttributes, PayloadCache,
    PayloadCacheEntry,
};
use ember_rpc_types::engine::PayloadId;
use std::{future::Future, pin::Pin, sync::Arc};

/// The future resolving to the first payload of a job.
pub type FirstPayloadFuture =
    Pin<Box<dyn Future<Output = Result<BuiltPayload, PayloadBuilderError>> + Send>>;

/// A type that improves a payload.
///
/// This type is a Future that resolves when the job is done (e.g. timed out or cancelled) or it
/// failed. Better payloads are published into the [`PayloadCache`] as they are built, so the best
/// payload is always available without polling the job.
///
/// Note: A PayloadJob must observe the cancellation token of its [`PayloadCacheEntry`], which
/// fires once the payload was requested via `engine_getPayload`, was superseded or was evicted.
pub trait PayloadJob: Future<Output = Result<(), PayloadBuilderError>> + Send + 'static {
    /// Returns the id of the payload this job improves.
    fn payload_id(&self) -> PayloadId;

    /// Returns the best payload that has been built so far.
    fn best_payload(&self) -> Arc<BuiltPayload>;
}

/// A type that knows how to create new jobs for creating payloads.
pub trait PayloadJobGenerator: Send + Sync {
    /// The type that manages the lifecycle of a payload.
    type Job: PayloadJob;

    /// Builds the first payload for the attributes.
    ///
    /// This is called when the CL requests a new payload job via a fork choice update, which
    /// waits for the returned future. It is expected to always produce some payload, falling back
    /// to an empty one, unless building on the parent is impossible.
    fn build_first_payload(&self, attributes: PayloadBuilderAttributes) -> FirstPayloadFuture;

    /// Creates a new [`PayloadJob`] that keeps improving the payload of the given entry.
    fn new_payload_job(&self, entry: Arc<PayloadCacheEntry>, cache: PayloadCache) -> Self::Job;
}

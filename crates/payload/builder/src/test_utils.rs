//! Utils for testing purposes.

use crate::{
    error::PayloadBuilderError, traits::FirstPayloadFuture, BuiltPayload, GcControl,
    PayloadBuilderAttributes, PayloadBuilderHandle, PayloadBuilderService, PayloadCache,
    PayloadCacheEntry, PayloadJob, PayloadJobGenerator, PayloadServiceConfig,
};
use ember_primitives::{Address, Block, Header, B256, U256};
use ember_rpc_types::engine::{PayloadAttributes, PayloadId};
use ember_tasks::TokioTaskExecutor;
use futures_util::{future::BoxFuture, FutureExt};
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

/// Creates a new [PayloadBuilderService] for testing purposes.
pub fn test_payload_service() -> (PayloadBuilderService<TestPayloadJobGenerator>, PayloadBuilderHandle)
{
    PayloadBuilderService::new(
        Default::default(),
        TokioTaskExecutor::default().boxed(),
        GcControl::NoOp,
        PayloadServiceConfig::default(),
    )
}

/// Creates a new [PayloadBuilderService] for testing purposes and spawns it in the background.
pub fn spawn_test_payload_service() -> PayloadBuilderHandle {
    let (service, handle) = test_payload_service();
    tokio::spawn(service);
    handle
}

/// Spawns a [PayloadBuilderService] with the given generator, GC control and settings.
pub fn spawn_test_payload_service_with(
    generator: TestPayloadJobGenerator,
    gc: GcControl,
    config: PayloadServiceConfig,
) -> PayloadBuilderHandle {
    let (service, handle) =
        PayloadBuilderService::new(generator, TokioTaskExecutor::default().boxed(), gc, config);
    tokio::spawn(service);
    handle
}

/// Returns attributes for a payload on top of `parent` at the given timestamp.
pub fn test_attributes(parent: B256, timestamp: u64) -> PayloadBuilderAttributes {
    PayloadBuilderAttributes::new(
        parent,
        PayloadAttributes {
            timestamp,
            prev_randao: B256::repeat_byte(0x42),
            suggested_fee_recipient: Address::repeat_byte(0x07),
            withdrawals: None,
            parent_beacon_block_root: None,
        },
    )
}

/// Returns an empty payload for the attributes.
pub fn empty_payload(attributes: &PayloadBuilderAttributes, fees: U256) -> BuiltPayload {
    let block = Block {
        header: Header {
            parent_hash: attributes.parent,
            timestamp: attributes.timestamp,
            beneficiary: attributes.suggested_fee_recipient,
            mix_hash: attributes.prev_randao,
            ..Default::default()
        },
        ..Default::default()
    };
    BuiltPayload::new(attributes.payload_id(), block.seal_slow(), fees)
}

/// A [PayloadJobGenerator] for testing purposes
///
/// First payloads are empty and built immediately. Jobs never improve them.
#[derive(Debug, Default)]
pub struct TestPayloadJobGenerator {
    failing: bool,
}

impl TestPayloadJobGenerator {
    /// Returns a generator that fails to build any first payload.
    pub const fn failing() -> Self {
        Self { failing: true }
    }
}

impl PayloadJobGenerator for TestPayloadJobGenerator {
    type Job = TestPayloadJob;

    fn build_first_payload(&self, attributes: PayloadBuilderAttributes) -> FirstPayloadFuture {
        let res = if self.failing {
            Err(PayloadBuilderError::Internal("test generator always fails".to_string()))
        } else {
            Ok(empty_payload(&attributes, U256::ZERO))
        };
        Box::pin(futures_util::future::ready(res))
    }

    fn new_payload_job(&self, entry: Arc<PayloadCacheEntry>, _cache: PayloadCache) -> Self::Job {
        let token = entry.cancellation_token();
        TestPayloadJob { entry, cancelled: async move { token.cancelled().await }.boxed() }
    }
}

/// A [PayloadJob] for testing purposes, finishes once its payload is no longer wanted.
pub struct TestPayloadJob {
    entry: Arc<PayloadCacheEntry>,
    cancelled: BoxFuture<'static, ()>,
}

impl Future for TestPayloadJob {
    type Output = Result<(), PayloadBuilderError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().cancelled.poll_unpin(cx).map(Ok)
    }
}

impl PayloadJob for TestPayloadJob {
    fn payload_id(&self) -> PayloadId {
        self.entry.id()
    }

    fn best_payload(&self) -> Arc<BuiltPayload> {
        self.entry.best_payload()
    }
}

impl fmt::Debug for TestPayloadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestPayloadJob").field("id", &self.entry.id()).finish_non_exhaustive()
    }
}

//! Support for building payloads.
//!
//! The payload builder is responsible for building payloads.
//! Once a new payload is created, it is continuously updated.

use crate::{
    error::PayloadBuilderError, metrics::PayloadBuilderServiceMetrics, traits::PayloadJobGenerator,
    BuiltPayload, Events, GcControl, PayloadBuilderAttributes, PayloadCache, PayloadCacheEntry,
    PayloadEvents, PayloadJob, PayloadJobState, DEFAULT_PAYLOAD_CACHE_SIZE,
};
use ember_primitives::{constants::SLOT_DURATION, B256};
use ember_rpc_types::engine::PayloadId;
use ember_tasks::TaskSpawner;
use futures_util::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use std::{
    collections::HashMap,
    fmt,
    future::Future,
    num::NonZeroUsize,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Interval, MissedTickBehavior},
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, trace, warn};

/// A communication channel to the [PayloadBuilderService] that can retrieve payloads.
///
/// Reads go straight to the [`PayloadCache`] and never wait for the service.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    inner: PayloadBuilderHandle,
}

// === impl PayloadStore ===

impl PayloadStore {
    /// Resolves the payload job and returns the best payload that has been built so far.
    ///
    /// This stops the job; the payload stays available until it expires.
    pub fn resolve(&self, id: PayloadId) -> Option<Arc<BuiltPayload>> {
        self.inner.resolve(id)
    }

    /// Returns the best payload for the given identifier.
    ///
    /// Note: this merely returns the best payload so far and does not resolve the job.
    pub fn best_payload(&self, id: PayloadId) -> Option<Arc<BuiltPayload>> {
        self.inner.best_payload(id)
    }

    /// Returns the payload attributes associated with the given identifier.
    ///
    /// Note: this returns the attributes of the payload and does not resolve the job.
    pub fn payload_attributes(&self, id: PayloadId) -> Option<PayloadBuilderAttributes> {
        self.inner.payload_attributes(id)
    }
}

impl From<PayloadBuilderHandle> for PayloadStore {
    fn from(inner: PayloadBuilderHandle) -> Self {
        Self { inner }
    }
}

/// A communication channel to the [PayloadBuilderService].
///
/// This is the API used to create new payloads and to get the current state of existing ones.
#[derive(Debug, Clone)]
pub struct PayloadBuilderHandle {
    /// Sender half of the message channel to the [PayloadBuilderService].
    to_service: mpsc::UnboundedSender<PayloadServiceCommand>,
    /// The cache the service publishes payloads into.
    cache: PayloadCache,
}

// === impl PayloadBuilderHandle ===

impl PayloadBuilderHandle {
    /// Creates a new payload builder handle for the given channel and cache.
    ///
    /// Note: this is only used internally by the [PayloadBuilderService] to manage the payload
    /// building flow See [PayloadBuilderService::poll] for implementation details.
    pub const fn new(
        to_service: mpsc::UnboundedSender<PayloadServiceCommand>,
        cache: PayloadCache,
    ) -> Self {
        Self { to_service, cache }
    }

    /// Resolves the payload job and returns the best payload that has been built so far.
    pub fn resolve(&self, id: PayloadId) -> Option<Arc<BuiltPayload>> {
        self.cache.resolve(id)
    }

    /// Returns the best payload for the given identifier.
    pub fn best_payload(&self, id: PayloadId) -> Option<Arc<BuiltPayload>> {
        self.cache.best_payload(id)
    }

    /// Returns the payload attributes associated with the given identifier.
    pub fn payload_attributes(&self, id: PayloadId) -> Option<PayloadBuilderAttributes> {
        self.cache.payload_attributes(id)
    }

    /// Sends a message to the service to start building a new payload for the given payload.
    ///
    /// This is the same as [PayloadBuilderHandle::new_payload] but does not wait for the result and
    /// returns the receiver instead
    pub fn send_new_payload(
        &self,
        attr: PayloadBuilderAttributes,
    ) -> oneshot::Receiver<Result<PayloadId, PayloadBuilderError>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.to_service.send(PayloadServiceCommand::BuildNewPayload(attr, tx));
        rx
    }

    /// Starts building a new payload for the given payload attributes.
    ///
    /// Returns the identifier of the payload once its first version is built.
    ///
    /// Note: if there's already payload in progress with same identifier, it will be returned.
    pub async fn new_payload(
        &self,
        attr: PayloadBuilderAttributes,
    ) -> Result<PayloadId, PayloadBuilderError> {
        self.send_new_payload(attr).await?
    }

    /// Notifies the service that the canonical head moved.
    ///
    /// Active jobs building on any other parent are superseded.
    pub fn new_head(&self, head: B256) {
        let _ = self.to_service.send(PayloadServiceCommand::NewHead(head));
    }

    /// Returns a new receiver for payload events.
    pub fn subscribe(&self) -> PayloadEvents {
        self.cache.subscribe()
    }

    /// Returns the payload cache.
    pub const fn cache(&self) -> &PayloadCache {
        &self.cache
    }
}

/// Settings for the [PayloadBuilderService].
#[derive(Debug, Clone)]
pub struct PayloadServiceConfig {
    /// Maximum number of cached payloads.
    cache_capacity: NonZeroUsize,
    /// How long a payload stays in the cache.
    ttl: Duration,
    /// How often expired payloads are swept out of the cache.
    sweep_interval: Duration,
}

// === impl PayloadServiceConfig ===

impl PayloadServiceConfig {
    /// Sets the maximum number of cached payloads.
    pub const fn cache_capacity(mut self, cache_capacity: NonZeroUsize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Sets how long a payload stays in the cache.
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets how often expired payloads are swept out of the cache.
    pub const fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }
}

impl Default for PayloadServiceConfig {
    fn default() -> Self {
        Self {
            cache_capacity: NonZeroUsize::new(DEFAULT_PAYLOAD_CACHE_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
            // five slots
            ttl: SLOT_DURATION * 5,
            sweep_interval: SLOT_DURATION,
        }
    }
}

/// A first build in flight.
type PendingFirstPayload =
    BoxFuture<'static, (PayloadBuilderAttributes, Result<BuiltPayload, PayloadBuilderError>)>;

/// A service that manages payload building tasks.
///
/// This type is an endless future that manages the building of payloads.
///
/// It waits for the first payload of every new job, publishes it into the [`PayloadCache`] and
/// spawns the job that improves it. It also sweeps expired payloads out of the cache, unless
/// garbage collection is currently suppressed.
///
/// By design, this type relies entirely on the [`PayloadJobGenerator`] to create new payloads and
/// does know nothing about how to build them, it just drives their jobs to completion.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PayloadBuilderService<Gen>
where
    Gen: PayloadJobGenerator,
{
    /// The type that knows how to create new payloads.
    generator: Gen,
    /// Built payloads by id.
    cache: PayloadCache,
    /// First builds in flight.
    pending: FuturesUnordered<PendingFirstPayload>,
    /// Everyone waiting for a first build to finish.
    waiters: HashMap<PayloadId, Vec<oneshot::Sender<Result<PayloadId, PayloadBuilderError>>>>,
    /// The latest head reported through [`PayloadBuilderHandle::new_head`].
    head: Option<B256>,
    /// How jobs are spawned.
    executor: Box<dyn TaskSpawner>,
    /// Coordination with garbage collection.
    gc: GcControl,
    /// How long payloads stay in the cache.
    ttl: Duration,
    /// Ticks when the cache should be swept.
    sweep_interval: Interval,
    /// Copy of the sender half, so new [`PayloadBuilderHandle`] can be created on demand.
    service_tx: mpsc::UnboundedSender<PayloadServiceCommand>,
    /// Receiver half of the command channel.
    command_rx: UnboundedReceiverStream<PayloadServiceCommand>,
    /// Metrics for the payload builder service
    metrics: PayloadBuilderServiceMetrics,
}

// === impl PayloadBuilderService ===

impl<Gen> PayloadBuilderService<Gen>
where
    Gen: PayloadJobGenerator,
{
    /// Creates a new payload builder service and returns the [PayloadBuilderHandle] to interact
    /// with it.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(
        generator: Gen,
        executor: Box<dyn TaskSpawner>,
        gc: GcControl,
        config: PayloadServiceConfig,
    ) -> (Self, PayloadBuilderHandle) {
        let (service_tx, command_rx) = mpsc::unbounded_channel();
        let mut sweep_interval = tokio::time::interval(config.sweep_interval);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let service = Self {
            generator,
            cache: PayloadCache::new(config.cache_capacity),
            pending: FuturesUnordered::new(),
            waiters: HashMap::new(),
            head: None,
            executor,
            gc,
            ttl: config.ttl,
            sweep_interval,
            service_tx,
            command_rx: UnboundedReceiverStream::new(command_rx),
            metrics: Default::default(),
        };

        let handle = service.handle();
        (service, handle)
    }

    /// Returns a handle to the service.
    pub fn handle(&self) -> PayloadBuilderHandle {
        PayloadBuilderHandle::new(self.service_tx.clone(), self.cache.clone())
    }

    /// Starts a job for the attributes, or joins the one that is already building the same id.
    fn on_new_payload(
        &mut self,
        attr: PayloadBuilderAttributes,
        tx: oneshot::Sender<Result<PayloadId, PayloadBuilderError>>,
    ) {
        let id = attr.payload_id();

        if let Some(entry) = self.cache.get(id) {
            // a job that ended without being consumed is restarted once its parent is the head
            // again, everything else is served from the cache
            let restart = matches!(
                entry.state(),
                PayloadJobState::Superseded | PayloadJobState::TimedOut
            ) && self.head.map_or(true, |head| head == attr.parent());
            if !restart {
                debug!(target: "payload_builder", %id, parent = %attr.parent(), "Payload job already in progress, ignoring.");
                let _ = tx.send(Ok(id));
                return
            }
            debug!(target: "payload_builder", %id, state = ?entry.state(), "Restarting finished payload job");
        }

        if let Some(waiters) = self.waiters.get_mut(&id) {
            trace!(target: "payload_builder", %id, "waiting for first payload already being built");
            waiters.push(tx);
            return
        }

        info!(target: "payload_builder", %id, parent = %attr.parent(), "New payload job created");
        self.metrics.inc_initiated_jobs();
        self.cache.emit(Events::Attributes(attr.clone()));
        self.waiters.insert(id, vec![tx]);

        let first_payload = self.generator.build_first_payload(attr.clone());
        self.pending.push(Box::pin(first_payload.map(move |res| (attr, res))));
    }

    /// Publishes a finished first payload and spawns the job that improves it.
    fn on_first_payload(
        &mut self,
        attr: PayloadBuilderAttributes,
        res: Result<BuiltPayload, PayloadBuilderError>,
    ) {
        let id = attr.payload_id();
        let waiters = self.waiters.remove(&id).unwrap_or_default();

        let res = match res {
            Ok(payload) => {
                let entry = Arc::new(PayloadCacheEntry::new(attr, payload));
                self.cache.insert(Arc::clone(&entry));

                if self.head.is_some_and(|head| head != entry.parent()) {
                    // the head moved while the first payload was built
                    entry.finish(PayloadJobState::Superseded);
                    self.metrics.superseded_jobs.increment(1);
                    debug!(target: "payload_builder", %id, parent = %entry.parent(), "first payload built on stale parent");
                } else {
                    self.spawn_job(entry);
                }
                Ok(id)
            }
            Err(err) => {
                warn!(target: "payload_builder", %id, %err, "Failed to build first payload");
                self.metrics.inc_failed_jobs();
                Err(err)
            }
        };

        for tx in waiters {
            let _ = tx.send(res.clone());
        }
    }

    /// Spawns the job improving the payload of the entry.
    fn spawn_job(&self, entry: Arc<PayloadCacheEntry>) {
        let job = self.generator.new_payload_job(Arc::clone(&entry), self.cache.clone());
        entry.mark_improving();

        let id = job.payload_id();
        let metrics = self.metrics.clone();
        metrics.active_jobs.increment(1.0);
        self.executor.spawn_task(Box::pin(async move {
            match job.await {
                Ok(()) => {
                    trace!(target: "payload_builder", %id, state = ?entry.state(), "payload job finished");
                }
                Err(err) => {
                    warn!(target: "payload_builder", %id, %err, "Payload builder job failed");
                    metrics.inc_failed_jobs();
                }
            }
            metrics.active_jobs.decrement(1.0);
        }));
    }

    /// Records the new head and supersedes jobs building on any other parent.
    fn on_new_head(&mut self, head: B256) {
        self.head = Some(head);
        let superseded = self.cache.supersede(head);
        if superseded > 0 {
            self.metrics.superseded_jobs.increment(superseded as u64);
            debug!(target: "payload_builder", %head, superseded, "new head superseded payload jobs");
        }
    }

    /// Removes expired payloads, unless garbage collection is suppressed.
    fn sweep(&self) {
        if self.gc.is_suppressing() {
            self.metrics.deferred_sweeps.increment(1);
            trace!(target: "gc", "deferring payload cache sweep");
            return
        }

        self.metrics.cache_sweeps.increment(1);
        let expired = self.cache.evict_older_than(self.ttl);
        if expired > 0 {
            debug!(target: "payload_builder", expired, remaining = self.cache.len(), "swept expired payloads");
        }
    }
}

impl<Gen> Future for PayloadBuilderService<Gen>
where
    Gen: PayloadJobGenerator + Unpin + 'static,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // drain all requests
        while let Poll::Ready(Some(cmd)) = this.command_rx.poll_next_unpin(cx) {
            match cmd {
                PayloadServiceCommand::BuildNewPayload(attr, tx) => this.on_new_payload(attr, tx),
                PayloadServiceCommand::NewHead(head) => this.on_new_head(head),
            }
        }

        // publish finished first payloads
        while let Poll::Ready(Some((attr, res))) = this.pending.poll_next_unpin(cx) {
            this.on_first_payload(attr, res);
        }

        while this.sweep_interval.poll_tick(cx).is_ready() {
            this.sweep();
        }

        Poll::Pending
    }
}

impl<Gen> fmt::Debug for PayloadBuilderService<Gen>
where
    Gen: PayloadJobGenerator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadBuilderService")
            .field("cache", &self.cache)
            .field("pending", &self.pending.len())
            .field("head", &self.head)
            .field("gc", &self.gc)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Message type for the [PayloadBuilderService].
pub enum PayloadServiceCommand {
    /// Start building a new payload.
    BuildNewPayload(
        PayloadBuilderAttributes,
        oneshot::Sender<Result<PayloadId, PayloadBuilderError>>,
    ),
    /// The canonical head moved.
    NewHead(B256),
}

impl fmt::Debug for PayloadServiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildNewPayload(f0, f1) => {
                f.debug_tuple("BuildNewPayload").field(&f0).field(&f1).finish()
            }
            Self::NewHead(f0) => f.debug_tuple("NewHead").field(&f0).finish(),
        }
    }
}

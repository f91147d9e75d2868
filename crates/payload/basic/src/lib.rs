//! A basic payload generator for ember.
//!
//! The [`BasicPayloadJobGenerator`] builds the first payload of a job right away, inside a
//! garbage collection suppression window, and then hands the payload over to a
//! [`BasicPayloadJob`] that keeps rebuilding it on an interval until it is resolved, superseded or
//! its deadline elapses.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use crate::metrics::PayloadBuilderMetrics;
use alloy_rlp::Encodable;
use ember_interfaces::blockchain_tree::BlockTree;
use ember_payload_builder::{
    error::PayloadBuilderError, BuiltPayload, FirstPayloadFuture, GcControl,
    PayloadBuilderAttributes, PayloadCache, PayloadCacheEntry, PayloadJob, PayloadJobGenerator,
    PayloadJobState,
};
use ember_primitives::{constants::EMBER_CLIENT_VERSION, Bytes, SealedHeader, U256};
use ember_tasks::TaskSpawner;
use futures_core::ready;
use futures_util::FutureExt;
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    sync::{oneshot, Semaphore},
    time::{Instant, Interval, Sleep},
};
use tokio_util::sync::WaitForCancellationFutureOwned;
use tracing::{debug, trace, warn};

mod metrics;

pub use ember_payload_builder::{is_better_payload, PayloadId};

/// The [`PayloadJobGenerator`] that creates [`BasicPayloadJob`]s.
pub struct BasicPayloadJobGenerator<Tree, Tasks, Builder> {
    /// The block tree payloads are built on.
    tree: Tree,
    /// How to spawn building tasks
    executor: Tasks,
    /// The configuration for the job generator.
    config: BasicPayloadJobGeneratorConfig,
    /// Restricts how many generator tasks can be executed at once.
    payload_task_guard: PayloadTaskGuard,
    /// The type responsible for building payloads.
    builder: Builder,
    /// Suppresses garbage collection while a first payload is built.
    gc: GcControl,
    /// metrics for this type
    metrics: PayloadBuilderMetrics,
}

// === impl BasicPayloadJobGenerator ===

impl<Tree, Tasks, Builder> BasicPayloadJobGenerator<Tree, Tasks, Builder> {
    /// Creates a new [BasicPayloadJobGenerator] with the given config and custom
    /// [PayloadBuilder]
    pub fn with_builder(
        tree: Tree,
        executor: Tasks,
        config: BasicPayloadJobGeneratorConfig,
        builder: Builder,
        gc: GcControl,
    ) -> Self {
        Self {
            tree,
            executor,
            payload_task_guard: PayloadTaskGuard::new(config.max_payload_tasks),
            config,
            builder,
            gc,
            metrics: Default::default(),
        }
    }

    /// Returns the configuration of the generator.
    pub const fn config(&self) -> &BasicPayloadJobGeneratorConfig {
        &self.config
    }
}

impl<Tree, Tasks, Builder> BasicPayloadJobGenerator<Tree, Tasks, Builder>
where
    Tree: BlockTree,
{
    /// Returns the header of the block the payload is built on.
    fn parent_header(
        &self,
        attributes: &PayloadBuilderAttributes,
    ) -> Result<SealedHeader, PayloadBuilderError> {
        self.tree
            .header_by_hash(attributes.parent)?
            .ok_or(PayloadBuilderError::MissingParentBlock(attributes.parent))
    }
}

impl<Tree, Tasks, Builder> PayloadJobGenerator for BasicPayloadJobGenerator<Tree, Tasks, Builder>
where
    Tree: BlockTree + Unpin + 'static,
    Tasks: TaskSpawner + Clone + Unpin + 'static,
    Builder: PayloadBuilder + Unpin + 'static,
{
    type Job = BasicPayloadJob<Tasks, Builder>;

    fn build_first_payload(&self, attributes: PayloadBuilderAttributes) -> FirstPayloadFuture {
        let parent = match self.parent_header(&attributes) {
            Ok(parent) => Arc::new(parent),
            Err(err) => return Box::pin(futures_util::future::ready(Err(err))),
        };

        debug!(target: "payload_builder", id = %attributes.payload_id(), parent = %parent.hash(), "building first payload");

        let args = BuildArguments {
            parent,
            attributes,
            extra_data: self.config.extradata.clone(),
            deadline: Instant::now() + self.config.first_build_deadline,
            best_payload: None,
        };
        let (tx, rx) = oneshot::channel();
        let gc_guard = self.gc.suppress();
        let builder = self.builder.clone();
        let metrics = self.metrics.clone();
        self.executor.spawn_blocking_task(Box::pin(async move {
            let started_at = Instant::now();
            let res = {
                // released on every exit path, including a panicking builder
                let _gc_guard = gc_guard;
                build_first_payload(&builder, args, &metrics)
            };
            metrics.first_payload_duration.record(started_at.elapsed().as_secs_f64());
            let _ = tx.send(res);
        }));

        Box::pin(async move { rx.await? })
    }

    fn new_payload_job(&self, entry: Arc<PayloadCacheEntry>, cache: PayloadCache) -> Self::Job {
        let parent = self.parent_header(entry.attributes()).map(Arc::new);

        let job_deadline = entry.created_at() + self.config.deadline;
        let cancelled = Box::pin(entry.cancellation_token().cancelled_owned());

        BasicPayloadJob {
            parent,
            extra_data: self.config.extradata.clone(),
            first_build_deadline: self.config.first_build_deadline,
            round: 1,
            job_deadline,
            deadline: Box::pin(tokio::time::sleep_until(job_deadline)),
            interval: tokio::time::interval(self.config.interval),
            cancelled,
            entry,
            cache,
            builder: self.builder.clone(),
            executor: self.executor.clone(),
            pending_block: None,
            payload_task_guard: self.payload_task_guard.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<Tree, Tasks, Builder> fmt::Debug for BasicPayloadJobGenerator<Tree, Tasks, Builder> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicPayloadJobGenerator")
            .field("config", &self.config)
            .field("gc", &self.gc)
            .finish_non_exhaustive()
    }
}

/// Builds the first payload of a job, falling back to an empty payload.
fn build_first_payload<Builder: PayloadBuilder>(
    builder: &Builder,
    args: BuildArguments,
    metrics: &PayloadBuilderMetrics,
) -> Result<BuiltPayload, PayloadBuilderError> {
    let parent = Arc::clone(&args.parent);
    let attributes = args.attributes.clone();
    let extra_data = args.extra_data.clone();

    match builder.try_build(args) {
        Ok(BuildOutcome::Better(payload)) => return Ok(payload),
        Ok(BuildOutcome::Aborted { fees }) => {
            trace!(target: "payload_builder", id = %attributes.payload_id(), ?fees, "first build aborted");
        }
        Err(err) => {
            warn!(target: "payload_builder", id = %attributes.payload_id(), %err, "first build failed, building empty payload");
        }
    }

    metrics.inc_empty_first_payloads();
    builder.build_empty_payload(&parent, &attributes, extra_data)
}

/// Restricts how many generator tasks can be executed at once.
#[derive(Debug, Clone)]
struct PayloadTaskGuard(Arc<Semaphore>);

// === impl PayloadTaskGuard ===

impl PayloadTaskGuard {
    fn new(max_payload_tasks: usize) -> Self {
        Self(Arc::new(Semaphore::new(max_payload_tasks)))
    }
}

/// Settings for the [BasicPayloadJobGenerator].
#[derive(Debug, Clone)]
pub struct BasicPayloadJobGeneratorConfig {
    /// Data to include in the block's extra data field.
    extradata: Bytes,
    /// The interval at which the job should build a new payload after the last.
    interval: Duration,
    /// How long a job keeps improving its payload.
    deadline: Duration,
    /// The time budget of the first build.
    first_build_deadline: Duration,
    /// Maximum number of tasks to spawn for building a payload.
    max_payload_tasks: usize,
}

// === impl BasicPayloadJobGeneratorConfig ===

impl BasicPayloadJobGeneratorConfig {
    /// Sets the interval at which the job should build a new payload after the last.
    ///
    /// # Panics
    ///
    /// If `interval` is zero.
    pub fn interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "interval must be greater than 0");
        self.interval = interval;
        self
    }

    /// Sets how long a job keeps improving its payload.
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Sets the time budget of the first build.
    ///
    /// Improvement rounds get a multiple of this budget.
    pub const fn first_build_deadline(mut self, first_build_deadline: Duration) -> Self {
        self.first_build_deadline = first_build_deadline;
        self
    }

    /// Sets the maximum number of tasks to spawn for building a payload(s).
    ///
    /// # Panics
    ///
    /// If `max_payload_tasks` is 0.
    pub fn max_payload_tasks(mut self, max_payload_tasks: usize) -> Self {
        assert!(max_payload_tasks > 0, "max_payload_tasks must be greater than 0");
        self.max_payload_tasks = max_payload_tasks;
        self
    }

    /// Sets the data to include in the block's extra data field.
    ///
    /// Defaults to the current client version: `rlp(EMBER_CLIENT_VERSION)`.
    pub fn extradata(mut self, extradata: Bytes) -> Self {
        self.extradata = extradata;
        self
    }
}

impl Default for BasicPayloadJobGeneratorConfig {
    fn default() -> Self {
        let mut extradata = Vec::new();
        EMBER_CLIENT_VERSION.as_bytes().encode(&mut extradata);
        Self {
            extradata: extradata.into(),
            interval: Duration::from_secs(1),
            // 12s slot time
            deadline: ember_primitives::constants::SLOT_DURATION,
            first_build_deadline: Duration::from_millis(500),
            max_payload_tasks: 3,
        }
    }
}

/// A basic payload job that continuously builds a payload with the best transactions from the pool.
///
/// Better payloads are published into the [`PayloadCache`]. The job ends once its entry is
/// cancelled or its deadline elapses.
pub struct BasicPayloadJob<Tasks, Builder> {
    /// The cache entry of the payload this job improves.
    entry: Arc<PayloadCacheEntry>,
    /// Where better payloads are published.
    cache: PayloadCache,
    /// The parent header, an error ends the job on its first poll.
    parent: Result<Arc<SealedHeader>, PayloadBuilderError>,
    /// Block extra data.
    extra_data: Bytes,
    /// Budget unit of a build round.
    first_build_deadline: Duration,
    /// The number of builds so far, including the first one.
    round: u32,
    /// When the job stops improving.
    job_deadline: Instant,
    /// The deadline when this job should resolve.
    deadline: Pin<Box<Sleep>>,
    /// The interval at which the job should build a new payload after the last.
    interval: Interval,
    /// Resolves once the payload is no longer wanted.
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    /// The type responsible for building payloads.
    builder: Builder,
    /// How to spawn building tasks
    executor: Tasks,
    /// Receiver for the block that is currently being built.
    pending_block: Option<PendingPayload>,
    /// Restricts how many generator tasks can be executed at once.
    payload_task_guard: PayloadTaskGuard,
    /// metrics for this type
    metrics: PayloadBuilderMetrics,
}

impl<Tasks, Builder> BasicPayloadJob<Tasks, Builder>
where
    Tasks: TaskSpawner + Clone + 'static,
    Builder: PayloadBuilder + Unpin + 'static,
{
    /// Spawns a new payload build task.
    fn spawn_build_job(&mut self, parent: Arc<SealedHeader>) {
        trace!(target: "payload_builder", id = %self.entry.id(), round = self.round, "spawn new payload build task");
        self.round += 1;
        let remaining = self.job_deadline.saturating_duration_since(Instant::now());
        let budget = (self.first_build_deadline * self.round).min(remaining);

        let args = BuildArguments {
            parent,
            attributes: self.entry.attributes().clone(),
            extra_data: self.extra_data.clone(),
            deadline: Instant::now() + budget,
            best_payload: Some(self.entry.best_payload()),
        };
        let (tx, rx) = oneshot::channel();
        let cancel = self.entry.cancellation_token();
        let guard = self.payload_task_guard.clone();
        let builder = self.builder.clone();
        self.metrics.inc_initiated_payload_builds();
        self.executor.spawn_blocking_task(Box::pin(async move {
            // acquire the permit for executing the task
            let _permit = guard.0.acquire().await;
            if cancel.is_cancelled() {
                return
            }
            let _ = tx.send(builder.try_build(args));
        }));
        self.pending_block = Some(PendingPayload { payload: rx });
    }
}

impl<Tasks, Builder> Future for BasicPayloadJob<Tasks, Builder>
where
    Tasks: TaskSpawner + Clone + Unpin + 'static,
    Builder: PayloadBuilder + Unpin + 'static,
{
    type Output = Result<(), PayloadBuilderError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let id = this.entry.id();

        if this.cancelled.as_mut().poll(cx).is_ready() {
            trace!(target: "payload_builder", %id, state = ?this.entry.state(), "payload job cancelled");
            return Poll::Ready(Ok(()))
        }

        // check if the deadline is reached
        if this.deadline.as_mut().poll(cx).is_ready() {
            trace!(target: "payload_builder", %id, "Payload building deadline reached");
            if this.entry.finish(PayloadJobState::TimedOut) {
                this.metrics.timed_out_jobs.increment(1);
            }
            return Poll::Ready(Ok(()))
        }

        let parent = match &this.parent {
            Ok(parent) => Arc::clone(parent),
            Err(err) => return Poll::Ready(Err(err.clone())),
        };

        // check if the interval is reached
        while this.interval.poll_tick(cx).is_ready() {
            // start a new job if there is no pending block
            if this.pending_block.is_none() {
                this.spawn_build_job(Arc::clone(&parent));
            }
        }

        // poll the pending block
        if let Some(mut fut) = this.pending_block.take() {
            match fut.poll_unpin(cx) {
                Poll::Ready(Ok(outcome)) => {
                    this.interval.reset();
                    match outcome {
                        BuildOutcome::Better(payload) => {
                            if this.cache.replace_if_better(id, payload) {
                                trace!(target: "payload_builder", %id, "built better payload");
                                this.metrics.improved_payload_builds.increment(1);
                            }
                        }
                        BuildOutcome::Aborted { fees } => {
                            trace!(target: "payload_builder", %id, ?fees, "skipped payload build of worse block");
                            this.metrics.aborted_payload_builds.increment(1);
                        }
                    }
                }
                Poll::Ready(Err(err)) => {
                    // job failed, but we simply try again next interval
                    trace!(target: "payload_builder", %id, %err, "payload build attempt failed");
                    this.metrics.inc_failed_payload_builds();
                }
                Poll::Pending => {
                    this.pending_block = Some(fut);
                }
            }
        }

        Poll::Pending
    }
}

impl<Tasks, Builder> PayloadJob for BasicPayloadJob<Tasks, Builder>
where
    Tasks: TaskSpawner + Clone + Unpin + 'static,
    Builder: PayloadBuilder + Unpin + 'static,
{
    fn payload_id(&self) -> PayloadId {
        self.entry.id()
    }

    fn best_payload(&self) -> Arc<BuiltPayload> {
        self.entry.best_payload()
    }
}

impl<Tasks, Builder> fmt::Debug for BasicPayloadJob<Tasks, Builder> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicPayloadJob")
            .field("id", &self.entry.id())
            .field("round", &self.round)
            .field("job_deadline", &self.job_deadline)
            .field("pending", &self.pending_block.is_some())
            .finish_non_exhaustive()
    }
}

/// A future that resolves to the result of the block building job.
struct PendingPayload {
    /// The channel to send the result to.
    payload: oneshot::Receiver<Result<BuildOutcome, PayloadBuilderError>>,
}

impl Future for PendingPayload {
    type Output = Result<BuildOutcome, PayloadBuilderError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let res = ready!(self.payload.poll_unpin(cx));
        Poll::Ready(res.map_err(Into::into).and_then(|res| res))
    }
}

/// The inputs of a single build.
#[derive(Debug, Clone)]
pub struct BuildArguments {
    /// The parent block header.
    pub parent: Arc<SealedHeader>,
    /// Requested attributes for the payload.
    pub attributes: PayloadBuilderAttributes,
    /// Block extra data.
    pub extra_data: Bytes,
    /// Transaction selection stops once this instant passes.
    pub deadline: Instant,
    /// The best payload built so far, if any.
    pub best_payload: Option<Arc<BuiltPayload>>,
}

impl BuildArguments {
    /// Returns true if the build ran out of time.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// The outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Successfully built a better block.
    Better(BuiltPayload),
    /// Aborted payload building because resulted in worse block wrt. fees.
    Aborted {
        /// Fees of the discarded block.
        fees: U256,
    },
}

/// A type that builds payloads.
///
/// Builds run on the blocking pool and must respect the deadline of their [`BuildArguments`].
pub trait PayloadBuilder: Send + Sync + Clone {
    /// Tries to build a payload that is better than the best payload of the arguments.
    fn try_build(&self, args: BuildArguments) -> Result<BuildOutcome, PayloadBuilderError>;

    /// Builds a payload without any transactions.
    fn build_empty_payload(
        &self,
        parent: &SealedHeader,
        attributes: &PayloadBuilderAttributes,
        extra_data: Bytes,
    ) -> Result<BuiltPayload, PayloadBuilderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ember_chainspec::ChainSpecBuilder;
    use ember_interfaces::test_utils::MockBlockTree;
    use ember_payload_builder::{
        test_utils::{empty_payload, test_attributes},
        PayloadBuilderService, PayloadServiceConfig,
    };
    use ember_primitives::B256;
    use ember_tasks::TokioTaskExecutor;
    use std::sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    };

    /// Builds empty payloads whose fees grow with every build.
    #[derive(Debug, Clone, Default)]
    struct CountingBuilder {
        builds: Arc<AtomicU64>,
        fail: Arc<AtomicBool>,
        gc: GcControl,
        gc_active_during_builds: Arc<Mutex<Vec<bool>>>,
    }

    impl PayloadBuilder for CountingBuilder {
        fn try_build(&self, args: BuildArguments) -> Result<BuildOutcome, PayloadBuilderError> {
            self.gc_active_during_builds.lock().unwrap().push(self.gc.is_suppressing());
            if self.fail.load(Ordering::Relaxed) {
                return Err(PayloadBuilderError::Internal("no state".to_string()))
            }
            let fees = U256::from(self.builds.fetch_add(1, Ordering::Relaxed) + 1);
            if !is_better_payload(args.best_payload.as_deref(), fees) {
                return Ok(BuildOutcome::Aborted { fees })
            }
            Ok(BuildOutcome::Better(empty_payload(&args.attributes, fees)))
        }

        fn build_empty_payload(
            &self,
            _parent: &SealedHeader,
            attributes: &PayloadBuilderAttributes,
            _extra_data: Bytes,
        ) -> Result<BuiltPayload, PayloadBuilderError> {
            Ok(empty_payload(attributes, U256::ZERO))
        }
    }

    fn generator(
        builder: CountingBuilder,
        config: BasicPayloadJobGeneratorConfig,
    ) -> (BasicPayloadJobGenerator<MockBlockTree, TokioTaskExecutor, CountingBuilder>, B256) {
        let tree = MockBlockTree::with_chain_spec(&ChainSpecBuilder::mainnet().all_active().build());
        let genesis = tree.head().hash();
        let gc = builder.gc.clone();
        (
            BasicPayloadJobGenerator::with_builder(
                tree,
                TokioTaskExecutor::default(),
                config,
                builder,
                gc,
            ),
            genesis,
        )
    }

    #[tokio::test]
    async fn first_payload_is_built_under_gc_suppression() {
        let builder =
            CountingBuilder { gc: GcControl::suppressing(Duration::from_secs(5)), ..Default::default() };
        let (generator, genesis) = generator(builder.clone(), Default::default());

        let attributes = test_attributes(genesis, 1);
        let payload = generator.build_first_payload(attributes.clone()).await.unwrap();
        assert_eq!(payload.id(), attributes.payload_id());
        assert_eq!(payload.fees(), U256::from(1));

        assert_eq!(*builder.gc_active_during_builds.lock().unwrap(), vec![true]);
        assert!(!builder.gc.is_suppressing());
    }

    #[tokio::test]
    async fn failed_first_build_falls_back_to_empty_payload() {
        let builder =
            CountingBuilder { gc: GcControl::suppressing(Duration::from_secs(5)), ..Default::default() };
        builder.fail.store(true, Ordering::Relaxed);
        let (generator, genesis) = generator(builder.clone(), Default::default());

        let payload = generator.build_first_payload(test_attributes(genesis, 1)).await.unwrap();
        assert_eq!(payload.fees(), U256::ZERO);
        assert!(payload.block().body.is_empty());
        assert_eq!(builder.gc.active_guards(), 0);
    }

    #[tokio::test]
    async fn unknown_parent_fails_first_build() {
        let (generator, _) = generator(CountingBuilder::default(), Default::default());
        let parent = B256::repeat_byte(0xee);

        assert_matches!(
            generator.build_first_payload(test_attributes(parent, 1)).await,
            Err(PayloadBuilderError::MissingParentBlock(hash)) if hash == parent
        );
    }

    #[tokio::test(start_paused = true)]
    async fn job_publishes_improvements_until_deadline() {
        let config = BasicPayloadJobGeneratorConfig::default()
            .interval(Duration::from_millis(100))
            .deadline(Duration::from_secs(1));
        let (generator, genesis) = generator(CountingBuilder::default(), config);
        let attributes = test_attributes(genesis, 1);

        let first = generator.build_first_payload(attributes.clone()).await.unwrap();
        let cache = PayloadCache::default();
        let entry = Arc::new(PayloadCacheEntry::new(attributes.clone(), first));
        cache.insert(Arc::clone(&entry));
        entry.mark_improving();

        let job = generator.new_payload_job(Arc::clone(&entry), cache.clone());
        job.await.unwrap();

        assert_eq!(entry.state(), PayloadJobState::TimedOut);
        assert!(entry.improvements() > 0);
        assert!(cache.best_payload(attributes.payload_id()).unwrap().fees() > U256::from(1));
    }

    #[tokio::test(start_paused = true)]
    async fn job_stops_when_resolved() {
        let config = BasicPayloadJobGeneratorConfig::default().interval(Duration::from_millis(100));
        let (generator, genesis) = generator(CountingBuilder::default(), config);
        let attributes = test_attributes(genesis, 1);

        let first = generator.build_first_payload(attributes.clone()).await.unwrap();
        let cache = PayloadCache::default();
        let entry = Arc::new(PayloadCacheEntry::new(attributes.clone(), first));
        cache.insert(Arc::clone(&entry));
        entry.mark_improving();

        let job = tokio::spawn(generator.new_payload_job(Arc::clone(&entry), cache.clone()));
        tokio::time::sleep(Duration::from_millis(350)).await;

        let resolved = cache.resolve(attributes.payload_id()).unwrap();
        job.await.unwrap().unwrap();
        assert_eq!(entry.state(), PayloadJobState::Consumed);
        assert_eq!(cache.best_payload(attributes.payload_id()).unwrap(), resolved);
    }

    #[tokio::test]
    async fn service_with_basic_generator() {
        let (generator, genesis) = generator(CountingBuilder::default(), Default::default());
        let (service, handle) = PayloadBuilderService::new(
            generator,
            TokioTaskExecutor::default().boxed(),
            GcControl::NoOp,
            PayloadServiceConfig::default(),
        );
        tokio::spawn(service);

        let attributes = test_attributes(genesis, 1);
        let id = handle.new_payload(attributes.clone()).await.unwrap();
        assert_eq!(id, attributes.payload_id());
        assert!(handle.resolve(id).is_some());
    }

    #[test]
    fn default_extradata_fits_header() {
        let config = BasicPayloadJobGeneratorConfig::default();
        assert!(config.extradata.len() <= ember_primitives::constants::MAXIMUM_EXTRA_DATA_SIZE);
    }

    #[test]
    #[should_panic(expected = "interval must be greater than 0")]
    fn zero_interval_is_rejected() {
        let _ = BasicPayloadJobGeneratorConfig::default().interval(Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "max_payload_tasks must be greater than 0")]
    fn zero_payload_tasks_are_rejected() {
        let _ = BasicPayloadJobGeneratorConfig::default().max_payload_tasks(0);
    }
}

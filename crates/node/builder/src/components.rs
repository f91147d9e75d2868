//! Support for configuring the components of a node.
//!
//! The payload service of a node is assembled from:
//!  - a [`BasicPayloadJobGenerator`] that schedules the first build and the improvement rounds
//!  - an [`EthereumPayloadBuilder`] that fills blocks from the transaction source
//!  - the [`GcControl`] chosen by the `[gc]` section of the [`Config`]

use alloy_rlp::Encodable;
use ember_basic_payload_builder::{BasicPayloadJobGenerator, BasicPayloadJobGeneratorConfig};
use ember_chainspec::ChainSpec;
use ember_config::{BuilderConfig, CacheConfig, Config, GcConfig, GcMode};
use ember_ethereum_payload_builder::{EthereumBuilderConfig, EthereumPayloadBuilder};
use ember_interfaces::{
    blockchain_tree::BlockTree, executor::BlockExecutor, transaction_pool::TransactionSource,
};
use ember_payload_builder::{
    GcControl, PayloadBuilderHandle, PayloadBuilderService, PayloadServiceConfig,
};
use ember_primitives::constants::MAXIMUM_EXTRA_DATA_SIZE;
use ember_tasks::TaskSpawner;
use eyre::{ensure, OptionExt};
use std::{num::NonZeroUsize, sync::Arc};
use tracing::debug;

/// Everything a component needs to be built.
#[derive(Debug)]
pub struct BuilderContext<Tree, Exec, Tasks> {
    pub(crate) config: Config,
    pub(crate) chain_spec: Arc<ChainSpec>,
    pub(crate) tree: Tree,
    pub(crate) executor: Exec,
    pub(crate) tasks: Tasks,
    pub(crate) gc: GcControl,
}

impl<Tree, Exec, Tasks> BuilderContext<Tree, Exec, Tasks> {
    /// Returns the loaded config.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the chain spec of the node.
    pub const fn chain_spec(&self) -> &Arc<ChainSpec> {
        &self.chain_spec
    }

    /// Returns the block tree.
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the block executor.
    pub const fn block_executor(&self) -> &Exec {
        &self.executor
    }

    /// Returns the spawner all component tasks run on.
    pub const fn task_executor(&self) -> &Tasks {
        &self.tasks
    }

    /// Returns the process wide garbage collection control.
    pub const fn gc(&self) -> &GcControl {
        &self.gc
    }
}

/// A type that knows how to spawn the payload service.
pub trait PayloadServiceBuilder<Tree, Exec, Tasks, Pool> {
    /// Spawns the payload service and returns the handle to it.
    fn spawn_payload_service(
        self,
        ctx: &BuilderContext<Tree, Exec, Tasks>,
        pool: Pool,
    ) -> eyre::Result<PayloadBuilderHandle>;
}

impl<F, Tree, Exec, Tasks, Pool> PayloadServiceBuilder<Tree, Exec, Tasks, Pool> for F
where
    F: FnOnce(&BuilderContext<Tree, Exec, Tasks>, Pool) -> eyre::Result<PayloadBuilderHandle>,
{
    fn spawn_payload_service(
        self,
        ctx: &BuilderContext<Tree, Exec, Tasks>,
        pool: Pool,
    ) -> eyre::Result<PayloadBuilderHandle> {
        self(ctx, pool)
    }
}

/// A basic ethereum payload service.
#[derive(Debug, Default, Clone, Copy)]
#[non_exhaustive]
pub struct EthereumPayloadServiceBuilder;

impl<Tree, Exec, Tasks, Pool> PayloadServiceBuilder<Tree, Exec, Tasks, Pool>
    for EthereumPayloadServiceBuilder
where
    Tree: BlockTree + Clone + Unpin + 'static,
    Exec: BlockExecutor + Clone + Unpin + 'static,
    Tasks: TaskSpawner + Clone + Unpin + 'static,
    Pool: TransactionSource + Clone + Unpin + 'static,
{
    fn spawn_payload_service(
        self,
        ctx: &BuilderContext<Tree, Exec, Tasks>,
        pool: Pool,
    ) -> eyre::Result<PayloadBuilderHandle> {
        let builder_config = &ctx.config.builder;
        let payload_builder = EthereumPayloadBuilder::new(
            ctx.chain_spec.clone(),
            ctx.executor.clone(),
            pool,
            ethereum_builder_config(builder_config),
        );
        let generator = BasicPayloadJobGenerator::with_builder(
            ctx.tree.clone(),
            ctx.tasks.clone(),
            payload_job_generator_config(builder_config)?,
            payload_builder,
            ctx.gc.clone(),
        );

        let (service, handle) = PayloadBuilderService::new(
            generator,
            Box::new(ctx.tasks.clone()),
            ctx.gc.clone(),
            payload_service_config(&ctx.config.cache)?,
        );
        ctx.tasks.spawn_critical_task("payload builder service", Box::pin(service));
        debug!(target: "ember::node", "Spawned payload builder service");

        Ok(handle)
    }
}

/// Converts the `[builder]` section into the job generator settings.
///
/// The extra data is RLP encoded and must still fit into the header field.
pub fn payload_job_generator_config(
    config: &BuilderConfig,
) -> eyre::Result<BasicPayloadJobGeneratorConfig> {
    ensure!(config.max_payload_tasks > 0, "builder.max_payload_tasks must be positive");
    ensure!(!config.interval.is_zero(), "builder.interval must be positive");

    let mut extradata = Vec::new();
    config.extra_data.as_bytes().encode(&mut extradata);
    ensure!(
        extradata.len() <= MAXIMUM_EXTRA_DATA_SIZE,
        "encoded extra data is {} bytes, at most {MAXIMUM_EXTRA_DATA_SIZE} are allowed",
        extradata.len()
    );

    Ok(BasicPayloadJobGeneratorConfig::default()
        .interval(config.interval)
        .deadline(config.deadline)
        .first_build_deadline(config.first_build_deadline)
        .max_payload_tasks(config.max_payload_tasks)
        .extradata(extradata.into()))
}

/// Converts the `[cache]` section into the payload service settings.
pub fn payload_service_config(config: &CacheConfig) -> eyre::Result<PayloadServiceConfig> {
    let capacity =
        NonZeroUsize::new(config.capacity).ok_or_eyre("cache.capacity must be positive")?;
    ensure!(!config.sweep_interval.is_zero(), "cache.sweep_interval must be positive");

    Ok(PayloadServiceConfig::default()
        .cache_capacity(capacity)
        .ttl(config.ttl)
        .sweep_interval(config.sweep_interval))
}

/// Returns the [`GcControl`] selected by the `[gc]` section.
pub fn gc_control(config: &GcConfig) -> GcControl {
    match config.mode {
        GcMode::Suppressing => GcControl::suppressing(config.max_window),
        GcMode::NoOp => GcControl::NoOp,
    }
}

/// Converts the `[builder]` section into the ethereum builder settings.
pub const fn ethereum_builder_config(config: &BuilderConfig) -> EthereumBuilderConfig {
    EthereumBuilderConfig::new().with_gas_limit(config.desired_gas_limit)
}

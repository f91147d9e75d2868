//! Customizable node builder.

use crate::{
    components::{gc_control, BuilderContext, EthereumPayloadServiceBuilder, PayloadServiceBuilder},
    EngineNode,
};
use ember_chainspec::ChainSpec;
use ember_config::Config;
use ember_interfaces::{blockchain_tree::BlockTree, executor::BlockExecutor};
use ember_rpc_engine_api::EngineApi;
use ember_tasks::TaskSpawner;
use std::sync::Arc;
use tracing::info;

/// Declaratively assembles an [`EngineNode`].
///
/// The node's collaborators are configured one by one, each call changes the builder's type.
/// [`EngineNodeBuilder::launch`] spawns the payload service onto the given spawner and connects
/// the engine API to it.
///
/// ```ignore
/// let node = EngineNodeBuilder::new(config, chain_spec)
///     .with_tree(tree)
///     .with_executor(executor)
///     .with_pool(pool)
///     .launch(TokioTaskExecutor::default())?;
/// ```
#[derive(Debug)]
pub struct EngineNodeBuilder<Tree = (), Exec = (), Pool = (), PB = EthereumPayloadServiceBuilder>
{
    config: Config,
    chain_spec: Arc<ChainSpec>,
    tree: Tree,
    executor: Exec,
    pool: Pool,
    payload_service: PB,
}

impl EngineNodeBuilder {
    /// Creates a new builder for the chain.
    pub fn new(config: Config, chain_spec: Arc<ChainSpec>) -> Self {
        Self {
            config,
            chain_spec,
            tree: (),
            executor: (),
            pool: (),
            payload_service: EthereumPayloadServiceBuilder,
        }
    }
}

impl<Tree, Exec, Pool, PB> EngineNodeBuilder<Tree, Exec, Pool, PB> {
    /// Returns the config the node is launched with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Configures the block tree payloads are built on and validated against.
    pub fn with_tree<T>(self, tree: T) -> EngineNodeBuilder<T, Exec, Pool, PB> {
        let Self { config, chain_spec, executor, pool, payload_service, .. } = self;
        EngineNodeBuilder { config, chain_spec, tree, executor, pool, payload_service }
    }

    /// Configures the executor that builds and re-executes blocks.
    pub fn with_executor<E>(self, executor: E) -> EngineNodeBuilder<Tree, E, Pool, PB> {
        let Self { config, chain_spec, tree, pool, payload_service, .. } = self;
        EngineNodeBuilder { config, chain_spec, tree, executor, pool, payload_service }
    }

    /// Configures the source of pending transactions.
    pub fn with_pool<P>(self, pool: P) -> EngineNodeBuilder<Tree, Exec, P, PB> {
        let Self { config, chain_spec, tree, executor, payload_service, .. } = self;
        EngineNodeBuilder { config, chain_spec, tree, executor, pool, payload_service }
    }

    /// Replaces the default [`EthereumPayloadServiceBuilder`].
    pub fn with_payload_service<B>(
        self,
        payload_service: B,
    ) -> EngineNodeBuilder<Tree, Exec, Pool, B> {
        let Self { config, chain_spec, tree, executor, pool, .. } = self;
        EngineNodeBuilder { config, chain_spec, tree, executor, pool, payload_service }
    }
}

impl<Tree, Exec, Pool, PB> EngineNodeBuilder<Tree, Exec, Pool, PB>
where
    Tree: BlockTree + Clone + 'static,
    Exec: BlockExecutor + 'static,
{
    /// Spawns the payload service and returns the running node.
    ///
    /// Must be called within a tokio runtime.
    pub fn launch<Tasks>(self, tasks: Tasks) -> eyre::Result<EngineNode<Tree, Exec>>
    where
        Tasks: TaskSpawner + Clone + 'static,
        PB: PayloadServiceBuilder<Tree, Exec, Tasks, Pool>,
    {
        let Self { config, chain_spec, tree, executor, pool, payload_service } = self;
        config.validate()?;

        let head = tree.canonical_head()?;
        info!(target: "ember::node", chain_id = chain_spec.chain_id, head = %head.hash(), number = head.number, gc = ?config.gc.mode, "Launching engine node");

        let gc = gc_control(&config.gc);
        let ctx = BuilderContext { config, chain_spec, tree, executor, tasks, gc };
        let payload_builder = payload_service.spawn_payload_service(&ctx, pool)?;
        payload_builder.new_head(head.hash());

        let BuilderContext { config, chain_spec, tree, executor, gc, .. } = ctx;
        let engine_api = EngineApi::new(chain_spec.clone(), tree, executor, payload_builder.clone());
        info!(target: "ember::node", "Engine API ready");

        Ok(EngineNode { config, chain_spec, engine_api, payload_builder, gc })
    }
}

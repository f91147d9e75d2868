use ember_chainspec::ChainSpec;
use ember_config::Config;
use ember_payload_builder::{GcControl, PayloadBuilderHandle, PayloadStore};
use ember_rpc_engine_api::EngineApi;
use std::sync::Arc;

/// A running engine node.
///
/// Dropping the node does not stop the payload service, it runs until the spawner that launched
/// it shuts down.
#[derive(Debug)]
pub struct EngineNode<Tree, Exec> {
    /// The config the node was launched with.
    pub config: Config,
    /// The chain spec of the node.
    pub chain_spec: Arc<ChainSpec>,
    /// The engine API served to the consensus client.
    pub engine_api: EngineApi<Tree, Exec>,
    /// Handle to the node's payload builder service.
    pub payload_builder: PayloadBuilderHandle,
    /// The process wide garbage collection control.
    pub gc: GcControl,
}

impl<Tree, Exec> EngineNode<Tree, Exec> {
    /// Returns a read-only view of the built payloads.
    pub fn payload_store(&self) -> PayloadStore {
        self.payload_builder.clone().into()
    }
}

impl<Tree, Exec> Clone for EngineNode<Tree, Exec> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            chain_spec: self.chain_spec.clone(),
            engine_api: self.engine_api.clone(),
            payload_builder: self.payload_builder.clone(),
            gc: self.gc.clone(),
        }
    }
}

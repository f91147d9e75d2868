//! Error types emitted by types or implementations of this crate.

use ember_interfaces::{executor::BlockExecutionError, provider::ProviderError};
use ember_primitives::B256;
use tokio::sync::oneshot;

/// Possible error variants during payload building.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PayloadBuilderError {
    /// Thrown when the parent block is missing.
    #[error("missing parent block {0}")]
    MissingParentBlock(B256),
    /// An oneshot channels has been closed.
    #[error("sender has been dropped")]
    ChannelClosed,
    /// Error occurring in the block tree.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Thrown if the executor failed to execute the block.
    #[error(transparent)]
    Execution(#[from] BlockExecutionError),
    /// Any other payload building error.
    #[error("{0}")]
    Internal(String),
}

impl From<oneshot::error::RecvError> for PayloadBuilderError {
    fn from(_: oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}

use crate::{BuiltPayload, PayloadBuilderAttributes};
use futures_util::Stream;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};

/// Payload builder events.
#[derive(Clone, Debug)]
pub enum Events {
    /// The payload attributes as they are received from the CL through the engine api, emitted
    /// when a new payload job starts.
    Attributes(PayloadBuilderAttributes),
    /// A strictly better payload replaced the best payload of a job.
    Improved(Arc<BuiltPayload>),
    /// The payload was handed out through `engine_getPayload` for the first time.
    Resolved(Arc<BuiltPayload>),
}

/// Represents a receiver for various payload events.
#[derive(Debug)]
pub struct PayloadEvents {
    /// The receiver half of the broadcast channel.
    pub receiver: broadcast::Receiver<Events>,
}

impl PayloadEvents {
    /// Convert this receiver into a stream of payload events.
    pub fn into_stream(self) -> impl Stream<Item = Result<Events, BroadcastStreamRecvError>> {
        BroadcastStream::new(self.receiver)
    }

    /// Asynchronously receives the next payload event.
    pub async fn recv(self) -> Option<Result<Events, BroadcastStreamRecvError>> {
        let mut event_stream = self.into_stream();
        event_stream.next().await
    }
}

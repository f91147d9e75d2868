//! Engine API types: <https://github.com/ethereum/execution-apis/tree/main/src/engine>

mod cancun;
mod forkchoice;
mod payload;

pub use cancun::{CancunPayloadFields, MaybeCancunPayloadFields};
pub use forkchoice::{ForkchoiceState, ForkchoiceUpdated};
pub use payload::{
    BlobsBundleV1, ExecutionPayload, ExecutionPayloadBodiesV1, ExecutionPayloadBodyV1,
    ExecutionPayloadEnvelopeV2, ExecutionPayloadEnvelopeV3, ExecutionPayloadFieldV2,
    ExecutionPayloadInputV2, ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3,
    PayloadAttributes, PayloadError, PayloadId, PayloadStatus, PayloadStatusEnum,
};

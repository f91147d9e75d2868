use ember_interfaces::provider::ProviderError;
use ember_payload_builder::PayloadBuilderError;
use ember_payload_primitives::EngineObjectValidationError;
use ember_payload_validator::NewPayloadError;
use jsonrpsee_types::error::{
    ErrorObject, ErrorObjectOwned, INTERNAL_ERROR_CODE, INVALID_PARAMS_CODE, METHOD_NOT_FOUND_CODE,
};
use thiserror::Error;

/// The Engine API result type
pub type EngineApiResult<Ok> = Result<Ok, EngineApiError>;

/// The JSON-RPC error object an [`EngineApiError`] is reported as.
pub type JsonRpcError = ErrorObjectOwned;

/// Payload unknown error code.
pub const UNKNOWN_PAYLOAD_CODE: i32 = -38001;
/// Invalid forkchoice state error code.
pub const INVALID_FORK_CHOICE_STATE_ERROR: i32 = -38002;
/// Invalid payload attributes error code.
pub const INVALID_PAYLOAD_ATTRIBUTES: i32 = -38003;
/// Request too large error code.
pub const REQUEST_TOO_LARGE_CODE: i32 = -38004;
/// Error code for calls to a method version the payload's fork is not served by.
pub const UNSUPPORTED_FORK_CODE: i32 = -38005;

/// Error returned by [`EngineApi`][crate::EngineApi]
#[derive(Error, Debug)]
pub enum EngineApiError {
    /// The method is not part of the Engine API.
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    /// The params could not be decoded.
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    /// Unknown payload requested.
    #[error("Unknown payload")]
    UnknownPayload,
    /// Forkchoice zero hash head received.
    #[error("Received zero hash as forkchoice head")]
    ForkchoiceEmptyHead,
    /// The safe or finalized block of a forkchoice state is unknown.
    #[error("Invalid forkchoice state")]
    InvalidForkchoiceState,
    /// The payload attributes can not be built on top of the forkchoice head.
    #[error("Invalid payload attributes")]
    InvalidPayloadAttributes,
    /// The payload body request length is too large.
    #[error("Payload request too large: {len}")]
    PayloadRequestTooLarge {
        /// The length that was requested.
        len: u64,
    },
    /// Thrown if `engine_getPayloadBodiesByRangeV1` contains an invalid range
    #[error("invalid start ({start}) or count ({count})")]
    InvalidBodiesRange {
        /// Start of the range
        start: u64,
        /// Requested number of items
        count: u64,
    },
    /// The payload or attributes do not match the called method version.
    #[error(transparent)]
    EngineObjectValidationError(#[from] EngineObjectValidationError),
    /// The block tree failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The payload builder failed to build the first payload.
    #[error(transparent)]
    PayloadBuilder(#[from] PayloadBuilderError),
    /// API encountered an internal error.
    #[error("{0}")]
    Internal(String),
}

impl EngineApiError {
    /// Returns the JSON-RPC error code of this error.
    pub const fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => METHOD_NOT_FOUND_CODE,
            Self::InvalidParams(_) |
            Self::ForkchoiceEmptyHead |
            Self::InvalidBodiesRange { .. } => INVALID_PARAMS_CODE,
            Self::UnknownPayload => UNKNOWN_PAYLOAD_CODE,
            Self::InvalidForkchoiceState => INVALID_FORK_CHOICE_STATE_ERROR,
            Self::InvalidPayloadAttributes => INVALID_PAYLOAD_ATTRIBUTES,
            Self::PayloadRequestTooLarge { .. } => REQUEST_TOO_LARGE_CODE,
            Self::EngineObjectValidationError(err) => match err {
                EngineObjectValidationError::UnsupportedFork => UNSUPPORTED_FORK_CODE,
                EngineObjectValidationError::Payload(_) |
                EngineObjectValidationError::PayloadAttributes(_) => INVALID_PARAMS_CODE,
            },
            Self::Provider(_) | Self::PayloadBuilder(_) | Self::Internal(_) => INTERNAL_ERROR_CODE,
        }
    }
}

impl From<NewPayloadError> for EngineApiError {
    fn from(err: NewPayloadError) -> Self {
        match err {
            NewPayloadError::Validation(err) => err.into(),
            NewPayloadError::Provider(err) => err.into(),
        }
    }
}

impl From<serde_json::Error> for EngineApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("failed to serialize response: {err}"))
    }
}

impl From<EngineApiError> for JsonRpcError {
    fn from(error: EngineApiError) -> Self {
        ErrorObject::owned(error.code(), error.to_string(), None::<()>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_payload_primitives::VersionSpecificValidationError;

    fn ensure_engine_rpc_error(code: i32, message: &str, err: EngineApiError) {
        let err: JsonRpcError = err.into();
        assert_eq!(err.code(), code);
        assert_eq!(err.message(), message);
    }

    #[test]
    fn engine_error_rpc_error_test() {
        ensure_engine_rpc_error(UNKNOWN_PAYLOAD_CODE, "Unknown payload", EngineApiError::UnknownPayload);
        ensure_engine_rpc_error(
            REQUEST_TOO_LARGE_CODE,
            "Payload request too large: 1025",
            EngineApiError::PayloadRequestTooLarge { len: 1025 },
        );
        ensure_engine_rpc_error(
            UNSUPPORTED_FORK_CODE,
            "Unsupported fork",
            EngineObjectValidationError::UnsupportedFork.into(),
        );
        ensure_engine_rpc_error(
            INVALID_PARAMS_CODE,
            "Payload attributes validation error: withdrawals not supported in V1",
            EngineObjectValidationError::PayloadAttributes(
                VersionSpecificValidationError::WithdrawalsNotSupportedInV1,
            )
            .into(),
        );
        ensure_engine_rpc_error(
            METHOD_NOT_FOUND_CODE,
            "Method not found: engine_foo",
            EngineApiError::MethodNotFound("engine_foo".to_string()),
        );
    }

    #[test]
    fn protocol_error_codes() {
        assert_eq!(EngineApiError::InvalidForkchoiceState.code(), -38002);
        assert_eq!(EngineApiError::InvalidPayloadAttributes.code(), -38003);
        assert_eq!(EngineApiError::ForkchoiceEmptyHead.code(), -32602);
        assert_eq!(EngineApiError::Internal("boom".into()).code(), -32603);
    }
}

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// All Engine API metrics
#[derive(Default)]
pub(crate) struct EngineApiMetrics {
    /// Engine API latency metrics
    pub(crate) latency: EngineApiLatencyMetrics,
    /// Engine API call outcomes
    pub(crate) calls: EngineApiCallMetrics,
}

/// Engine API latency metrics.
#[derive(Metrics)]
#[metrics(scope = "engine.rpc")]
pub(crate) struct EngineApiLatencyMetrics {
    /// Latency for `engine_newPayloadV1`
    pub(crate) new_payload_v1: Histogram,
    /// Latency for `engine_newPayloadV2`
    pub(crate) new_payload_v2: Histogram,
    /// Latency for `engine_newPayloadV3`
    pub(crate) new_payload_v3: Histogram,
    /// Latency for `engine_forkchoiceUpdatedV1`
    pub(crate) fork_choice_updated_v1: Histogram,
    /// Latency for `engine_forkchoiceUpdatedV2`
    pub(crate) fork_choice_updated_v2: Histogram,
    /// Latency for `engine_forkchoiceUpdatedV3`
    pub(crate) fork_choice_updated_v3: Histogram,
    /// Latency for `engine_getPayloadV1`
    pub(crate) get_payload_v1: Histogram,
    /// Latency for `engine_getPayloadV2`
    pub(crate) get_payload_v2: Histogram,
    /// Latency for `engine_getPayloadV3`
    pub(crate) get_payload_v3: Histogram,
    /// Latency for `engine_getPayloadBodiesByRangeV1`
    pub(crate) get_payload_bodies_by_range_v1: Histogram,
    /// Latency for `engine_getPayloadBodiesByHashV1`
    pub(crate) get_payload_bodies_by_hash_v1: Histogram,
}

impl std::fmt::Debug for EngineApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineApiMetrics").finish_non_exhaustive()
    }
}

/// Outcomes of Engine API calls.
#[derive(Metrics)]
#[metrics(scope = "engine.rpc.calls")]
pub(crate) struct EngineApiCallMetrics {
    /// Calls to unknown methods
    pub(crate) unknown_methods: Counter,
    /// Calls rejected because the method version does not serve the fork
    pub(crate) unsupported_fork: Counter,
    /// Calls rejected because of malformed params
    pub(crate) invalid_params: Counter,
    /// `engine_getPayload` calls for an unknown payload id
    pub(crate) unknown_payloads: Counter,
}

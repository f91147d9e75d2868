use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics of `engine_newPayload` validation.
#[derive(Metrics)]
#[metrics(scope = "engine.validator")]
pub(crate) struct PayloadValidatorMetrics {
    /// Payloads found valid and added to the canonical chain.
    pub(crate) valid_payloads: Counter,
    /// Payloads accepted onto a side chain.
    pub(crate) accepted_payloads: Counter,
    /// Payloads found invalid.
    pub(crate) invalid_payloads: Counter,
    /// Payloads whose block hash did not match.
    pub(crate) invalid_block_hash_payloads: Counter,
    /// Payloads whose parent is unknown.
    pub(crate) syncing_payloads: Counter,
    /// Payloads whose blob versioned hashes did not match their transactions.
    pub(crate) versioned_hash_mismatches: Counter,
    /// Time it took to execute a payload.
    pub(crate) execution_duration: Histogram,
}

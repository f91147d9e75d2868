//! Metrics for the payload builder impl

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Payload job metrics
#[derive(Metrics, Clone)]
#[metrics(scope = "payloads")]
pub(crate) struct PayloadBuilderMetrics {
    /// Number of payload builds initiated
    pub(crate) initiated_payload_builds: Counter,
    /// Number of failed payload builds
    pub(crate) failed_payload_builds: Counter,
    /// Number of builds that produced a better payload
    pub(crate) improved_payload_builds: Counter,
    /// Number of builds discarded because they were not better
    pub(crate) aborted_payload_builds: Counter,
    /// Number of first payloads that fell back to an empty block
    pub(crate) empty_first_payloads: Counter,
    /// Number of jobs that ran until their deadline
    pub(crate) timed_out_jobs: Counter,
    /// How long building the first payload took
    pub(crate) first_payload_duration: Histogram,
}

impl PayloadBuilderMetrics {
    pub(crate) fn inc_initiated_payload_builds(&self) {
        self.initiated_payload_builds.increment(1);
    }

    pub(crate) fn inc_failed_payload_builds(&self) {
        self.failed_payload_builds.increment(1);
    }

    pub(crate) fn inc_empty_first_payloads(&self) {
        self.empty_first_payloads.increment(1);
    }
}

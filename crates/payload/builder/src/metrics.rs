//! Payload builder service metrics.

use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;

/// Payload builder service metrics
#[derive(Metrics, Clone)]
#[metrics(scope = "payloads")]
pub(crate) struct PayloadBuilderServiceMetrics {
    /// Number of active jobs
    pub(crate) active_jobs: Gauge,
    /// Total number of initiated jobs
    pub(crate) initiated_jobs: Counter,
    /// Total number of failed jobs
    pub(crate) failed_jobs: Counter,
    /// Total number of jobs superseded by a new head
    pub(crate) superseded_jobs: Counter,
    /// Total number of cache sweeps
    pub(crate) cache_sweeps: Counter,
    /// Total number of cache sweeps deferred by an open GC suppression window
    pub(crate) deferred_sweeps: Counter,
}

impl PayloadBuilderServiceMetrics {
    pub(crate) fn inc_initiated_jobs(&self) {
        self.initiated_jobs.increment(1);
    }

    pub(crate) fn inc_failed_jobs(&self) {
        self.failed_jobs.increment(1);
    }
}

/// Payload cache metrics
#[derive(Metrics)]
#[metrics(scope = "payloads.cache")]
pub(crate) struct PayloadCacheMetrics {
    /// Number of cached payloads
    pub(crate) entries: Gauge,
    /// Total number of entries evicted to make room for new ones
    pub(crate) capacity_evictions: Counter,
    /// Total number of entries removed because they expired
    pub(crate) expired_entries: Counter,
    /// Total number of times a best payload was replaced by a better one
    pub(crate) improvements: Counter,
}

/// Garbage collection coordination metrics
#[derive(Metrics)]
#[metrics(scope = "gc")]
pub(crate) struct GcMetrics {
    /// Total number of suppression windows opened
    pub(crate) windows_opened: Counter,
    /// Total number of suppression windows that outlived their maximum duration
    pub(crate) expired_windows: Counter,
    /// How long suppression windows stayed open, in seconds
    pub(crate) window_duration: Histogram,
}

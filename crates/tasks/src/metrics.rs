//! Task Executor Metrics
use metrics::Counter;
use metrics_derive::Metrics;

/// Task Executor Metrics
#[derive(Metrics, Clone)]
#[metrics(scope = "executor.spawn")]
pub struct TaskExecutorMetrics {
    /// Number of spawned critical tasks
    pub(crate) critical_tasks: Counter,
    /// Number of finished spawned critical tasks
    pub(crate) finished_critical_tasks: Counter,
    /// Number of spawned regular tasks
    pub(crate) regular_tasks: Counter,
    /// Number of finished spawned regular tasks
    pub(crate) finished_regular_tasks: Counter,
    /// Number of spawned blocking tasks
    pub(crate) blocking_tasks: Counter,
}

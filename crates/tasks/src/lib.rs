//! Ember task management.
//!
//! Components never spawn onto tokio directly. They are handed a [`TaskSpawner`] so tests can
//! run them on a plain [`TokioTaskExecutor`] while the node runs them on a [`TaskExecutor`] that
//! watches critical tasks for panics and shuts everything down together.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use crate::metrics::TaskExecutorMetrics;
use dyn_clone::DynClone;
use futures_util::{future::BoxFuture, FutureExt};
use std::{
    any::Any,
    fmt::{Display, Formatter},
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    runtime::Handle,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub mod metrics;

/// A type that can spawn tasks.
///
/// The main purpose of this type is to abstract over [`TaskExecutor`] so it's more convenient to
/// provide default impls for testing.
///
/// # Examples
///
/// Use the [`TokioTaskExecutor`] that spawns with [`tokio::task::spawn`]
///
/// ```
/// # async fn t() {
/// use ember_tasks::{TaskSpawner, TokioTaskExecutor};
/// let executor = TokioTaskExecutor::default();
///
/// let task = executor.spawn_task(Box::pin(async {
///     // -- snip --
/// }));
/// task.await.unwrap();
/// # }
/// ```
///
/// The [`TaskSpawner`] trait is [`DynClone`] so `Box<dyn TaskSpawner>` are also `Clone`.
#[auto_impl::auto_impl(&, Arc)]
pub trait TaskSpawner: Send + Sync + Unpin + std::fmt::Debug + DynClone {
    /// Spawns the task onto the runtime.
    /// See also [`Handle::spawn`].
    fn spawn_task(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()>;

    /// This spawns a critical task onto the runtime.
    fn spawn_critical_task(
        &self,
        name: &'static str,
        fut: BoxFuture<'static, ()>,
    ) -> JoinHandle<()>;

    /// Spawns a blocking task onto the runtime.
    fn spawn_blocking_task(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()>;
}

dyn_clone::clone_trait_object!(TaskSpawner);

/// An [`TaskSpawner`] that uses [`tokio::task::spawn`] to execute tasks
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct TokioTaskExecutor;

impl TokioTaskExecutor {
    /// Converts the instance to a boxed [`TaskSpawner`].
    pub fn boxed(self) -> Box<dyn TaskSpawner + 'static> {
        Box::new(self)
    }
}

impl TaskSpawner for TokioTaskExecutor {
    fn spawn_task(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
        tokio::task::spawn(fut)
    }

    fn spawn_critical_task(
        &self,
        _name: &'static str,
        fut: BoxFuture<'static, ()>,
    ) -> JoinHandle<()> {
        tokio::task::spawn(fut)
    }

    fn spawn_blocking_task(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || Handle::current().block_on(fut))
    }
}

/// Monitors critical tasks for panics and manages shutdown.
///
/// The main purpose of this type is to be able to monitor if a critical task panicked, for
/// diagnostic purposes, since tokio tasks essentially fail silently. Therefore, this type is a
/// Future that resolves with the name of the panicked task. See
/// [`TaskExecutor::spawn_critical`].
///
/// Dropping the manager shuts down all tasks spawned by its executors.
#[derive(Debug)]
#[must_use = "TaskManager must be polled to monitor critical tasks"]
pub struct TaskManager {
    /// Handle to the tokio runtime this task manager is associated with.
    handle: Handle,
    /// Sender half for sending panic signals to this type
    panicked_tasks_tx: UnboundedSender<PanickedTaskError>,
    /// Listens for panicked tasks
    panicked_tasks_rx: UnboundedReceiver<PanickedTaskError>,
    /// Cancelled when the manager shuts down.
    shutdown: CancellationToken,
}

// === impl TaskManager ===

impl TaskManager {
    /// Creates a new instance connected to the given handle's tokio runtime.
    pub fn new(handle: Handle) -> Self {
        let (panicked_tasks_tx, panicked_tasks_rx) = unbounded_channel();
        Self { handle, panicked_tasks_tx, panicked_tasks_rx, shutdown: CancellationToken::new() }
    }

    /// Creates a new instance connected to the runtime of the current context.
    ///
    /// # Panics
    ///
    /// If called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Returns a new [`TaskExecutor`] that can spawn new tasks onto the tokio runtime this type is
    /// connected to.
    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor {
            handle: self.handle.clone(),
            shutdown: self.shutdown.clone(),
            panicked_tasks_tx: self.panicked_tasks_tx.clone(),
            metrics: Default::default(),
        }
    }

    /// Signals all spawned tasks to stop.
    pub fn graceful_shutdown(self) {
        debug!(target: "tasks", "shutting down spawned tasks");
        self.shutdown.cancel();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// An endless future that resolves if a critical task panicked.
///
/// See [`TaskExecutor::spawn_critical`]
impl Future for TaskManager {
    type Output = PanickedTaskError;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // the manager holds a sender itself, so the channel never closes
        match self.get_mut().panicked_tasks_rx.poll_recv(cx) {
            Poll::Ready(Some(err)) => Poll::Ready(err),
            _ => Poll::Pending,
        }
    }
}

/// Error with the name of the task that panicked and an error downcasted to string, if possible.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub struct PanickedTaskError {
    task_name: &'static str,
    error: Option<String>,
}

impl Display for PanickedTaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let task_name = self.task_name;
        if let Some(error) = &self.error {
            write!(f, "Critical task `{task_name}` panicked: `{error}`")
        } else {
            write!(f, "Critical task `{task_name}` panicked")
        }
    }
}

impl PanickedTaskError {
    fn new(task_name: &'static str, error: Box<dyn Any + Send>) -> Self {
        let error = match error.downcast::<String>() {
            Ok(value) => Some(*value),
            Err(error) => match error.downcast::<&str>() {
                Ok(value) => Some(value.to_string()),
                Err(_) => None,
            },
        };

        Self { task_name, error }
    }

    /// Name of the task that panicked.
    pub const fn task_name(&self) -> &'static str {
        self.task_name
    }
}

/// A type that can spawn new tokio tasks
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    /// Handle to the tokio runtime this task manager is associated with.
    handle: Handle,
    /// Cancelled when the [`TaskManager`] shuts down.
    shutdown: CancellationToken,
    /// Sender half for sending panic signals to the [`TaskManager`]
    panicked_tasks_tx: UnboundedSender<PanickedTaskError>,
    /// Task Executor Metrics
    metrics: TaskExecutorMetrics,
}

// === impl TaskExecutor ===

impl TaskExecutor {
    /// Returns the [Handle] to the tokio runtime.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns a token that is cancelled once the [`TaskManager`] shuts down.
    pub fn on_shutdown_signal(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns the task onto the runtime.
    ///
    /// The task is dropped when the [`TaskManager`] shuts down.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.metrics.regular_tasks.increment(1);
        let shutdown = self.shutdown.clone();
        let finished = self.metrics.finished_regular_tasks.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = fut => {}
            }
            finished.increment(1);
        })
    }

    /// This spawns a critical task onto the runtime.
    ///
    /// If this task panics, the [`TaskManager`] is notified. The task is dropped when the
    /// [`TaskManager`] shuts down.
    pub fn spawn_critical<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.metrics.critical_tasks.increment(1);
        let panicked_tasks_tx = self.panicked_tasks_tx.clone();
        let shutdown = self.shutdown.clone();
        let finished = self.metrics.finished_critical_tasks.clone();

        let task = AssertUnwindSafe(fut).catch_unwind().map(move |res| {
            if let Err(panic) = res {
                let err = PanickedTaskError::new(name, panic);
                error!(target: "tasks", task = name, %err, "critical task panicked");
                let _ = panicked_tasks_tx.send(err);
            }
        });

        self.handle.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = task => {}
            }
            finished.increment(1);
        })
    }

    /// Spawns a future on the blocking thread pool and drives it to completion there.
    pub fn spawn_blocking<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.metrics.blocking_tasks.increment(1);
        let handle = self.handle.clone();
        self.handle.spawn_blocking(move || handle.block_on(fut))
    }
}

impl TaskSpawner for TaskExecutor {
    fn spawn_task(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
        self.spawn(fut)
    }

    fn spawn_critical_task(
        &self,
        name: &'static str,
        fut: BoxFuture<'static, ()>,
    ) -> JoinHandle<()> {
        self.spawn_critical(name, fut)
    }

    fn spawn_blocking_task(&self, fut: BoxFuture<'static, ()>) -> JoinHandle<()> {
        self.spawn_blocking(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    #[test]
    fn test_cloneable() {
        #[derive(Clone)]
        struct ExecutorWrapper {
            _e: Box<dyn TaskSpawner>,
        }

        let executor: Box<dyn TaskSpawner> = Box::<TokioTaskExecutor>::default();
        let _e = dyn_clone::clone_box(&*executor);

        let e = ExecutorWrapper { _e };
        let _e2 = e;
    }

    #[test]
    fn test_critical() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = runtime.handle().clone();
        let manager = TaskManager::new(handle);
        let executor = manager.executor();

        executor.spawn_critical("this is a critical task", async { panic!("intentionally panic") });

        runtime.block_on(async move {
            let err = manager.await;
            assert_eq!(err.task_name(), "this is a critical task");
            assert_eq!(err.error, Some("intentionally panic".to_string()));
        })
    }

    #[test]
    fn test_manager_shutdown_stops_tasks() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let manager = TaskManager::new(runtime.handle().clone());
        let executor = manager.executor();

        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let task = executor.spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.store(true, Ordering::Relaxed);
        });

        manager.graceful_shutdown();
        runtime.block_on(task).unwrap();
        assert!(!finished.load(Ordering::Relaxed));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_task_runs_future() {
        let executor = TokioTaskExecutor::default();
        let (tx, rx) = tokio::sync::oneshot::channel();
        executor
            .spawn_blocking_task(Box::pin(async move {
                let _ = tx.send(42);
            }))
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }
}

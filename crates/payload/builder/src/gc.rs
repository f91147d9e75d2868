//! Coordination with garbage collection pauses.
//!
//! Building the first payload of a slot is latency critical. While it runs, non-urgent
//! reclamation work (such as sweeping expired payloads out of the cache) is deferred. Callers
//! open a suppression window by holding a [`GcGuard`]; overlapping guards share one window.
//!
//! A window never outlives its maximum duration: once `max_window` has passed since it opened,
//! [`GcControl::is_suppressing`] reports `false` even while guards are still held. Guards that
//! join an expired window do not extend it; a fresh window only opens after all guards of the
//! previous one have been dropped.

use crate::metrics::GcMetrics;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, trace};

/// How garbage collection is coordinated with latency critical work.
///
/// Chosen once at startup and shared process wide.
#[derive(Debug, Clone, Default)]
pub enum GcControl {
    /// Defer reclamation while a suppression window is open.
    Suppressing(Arc<SuppressionWindow>),
    /// Never defer anything.
    #[default]
    NoOp,
}

impl GcControl {
    /// Creates a suppressing control whose windows close after at most `max_window`.
    pub fn suppressing(max_window: Duration) -> Self {
        Self::Suppressing(Arc::new(SuppressionWindow::new(max_window)))
    }

    /// Opens, or joins, a suppression window that lasts until the returned guard is dropped.
    pub fn suppress(&self) -> GcGuard {
        match self {
            Self::Suppressing(window) => {
                window.acquire();
                GcGuard { window: Some(Arc::clone(window)) }
            }
            Self::NoOp => GcGuard { window: None },
        }
    }

    /// Returns true if reclamation should currently be deferred.
    pub fn is_suppressing(&self) -> bool {
        match self {
            Self::Suppressing(window) => window.is_open(),
            Self::NoOp => false,
        }
    }

    /// Number of guards currently held.
    pub fn active_guards(&self) -> usize {
        match self {
            Self::Suppressing(window) => window.state.lock().guards,
            Self::NoOp => 0,
        }
    }
}

/// A reference counted, time bounded suppression window.
#[derive(Debug)]
pub struct SuppressionWindow {
    max_window: Duration,
    state: Mutex<WindowState>,
    metrics: GcMetrics,
}

#[derive(Debug, Default)]
struct WindowState {
    guards: usize,
    opened_at: Option<Instant>,
    expired: bool,
}

impl SuppressionWindow {
    fn new(max_window: Duration) -> Self {
        Self { max_window, state: Mutex::default(), metrics: GcMetrics::default() }
    }

    /// The maximum duration of a window.
    pub const fn max_window(&self) -> Duration {
        self.max_window
    }

    fn acquire(&self) {
        let mut state = self.state.lock();
        if state.guards == 0 {
            state.opened_at = Some(Instant::now());
            state.expired = false;
            self.metrics.windows_opened.increment(1);
            trace!(target: "gc", "opened suppression window");
        }
        state.guards += 1;
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.guards = state.guards.saturating_sub(1);
        if state.guards == 0 {
            if let Some(opened_at) = state.opened_at.take() {
                let open_for = opened_at.elapsed();
                self.metrics.window_duration.record(open_for.as_secs_f64());
                trace!(target: "gc", ?open_for, "closed suppression window");
            }
        }
    }

    fn is_open(&self) -> bool {
        let mut state = self.state.lock();
        let Some(opened_at) = state.opened_at else { return false };
        if opened_at.elapsed() < self.max_window {
            return true
        }
        if !state.expired {
            state.expired = true;
            self.metrics.expired_windows.increment(1);
            debug!(target: "gc", guards = state.guards, max_window = ?self.max_window, "suppression window expired");
        }
        false
    }
}

/// Keeps a suppression window open until dropped.
#[derive(Debug)]
#[must_use = "the suppression window closes when the guard is dropped"]
pub struct GcGuard {
    window: Option<Arc<SuppressionWindow>>,
}

impl Drop for GcGuard {
    fn drop(&mut self) {
        if let Some(window) = self.window.take() {
            window.release();
        }
    }
}

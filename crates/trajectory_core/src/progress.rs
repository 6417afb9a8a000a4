//! Progress tracking and cancellation for ensemble runs
//!
//! A `SimulationProgress` is cheap to clone; every clone shares the same
//! counters, so a caller can keep one handle to watch or cancel a run that
//! another thread is executing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::SimulationError;

/// Shared progress counters for one run
#[derive(Debug, Clone)]
pub struct SimulationProgress {
    /// Completed paths counter
    completed: Arc<AtomicUsize>,
    /// Total paths
    total: Arc<AtomicUsize>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SimulationProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Fail the run once `timeout` has elapsed from now
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.completed() as f64 / total as f64).min(1.0)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the counters for a new run of `total` paths
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Called between paths; cancellation wins over the deadline
    pub fn check(&self) -> Result<(), SimulationError> {
        if self.is_cancelled() {
            return Err(SimulationError::Cancelled);
        }
        if self.is_expired() {
            return Err(SimulationError::TimedOut {
                completed: self.completed(),
                total: self.total(),
            });
        }
        Ok(())
    }
}

impl Default for SimulationProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

//! Global atomic counters for MLR-Bench observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a CLI invocation).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    events_emitted: AtomicU64,
    listener_failures: AtomicU64,
    stages_completed: AtomicU64,
    stages_failed: AtomicU64,
    retries_scheduled: AtomicU64,
    evaluations_run: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_emitted: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
            stages_completed: AtomicU64::new(0),
            stages_failed: AtomicU64::new(0),
            retries_scheduled: AtomicU64::new(0),
            evaluations_run: AtomicU64::new(0),
        }
    }

    pub fn inc_events_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_emitted", "counter incremented");
    }

    pub fn inc_listener_failures(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "listener_failures", "counter incremented");
    }

    pub fn inc_stages_completed(&self) {
        self.stages_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stages_completed", "counter incremented");
    }

    pub fn inc_stages_failed(&self) {
        self.stages_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stages_failed", "counter incremented");
    }

    pub fn inc_retries(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retries_scheduled", "counter incremented");
    }

    pub fn inc_evaluations(&self) {
        self.evaluations_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_run", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a task batch, process exit)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_emitted = self.events_emitted(),
            listener_failures = self.listener_failures(),
            stages_completed = self.stages_completed(),
            stages_failed = self.stages_failed(),
            retries_scheduled = self.retries_scheduled(),
            evaluations_run = self.evaluations_run(),
        );
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    pub fn listener_failures(&self) -> u64 {
        self.listener_failures.load(Ordering::Relaxed)
    }

    pub fn stages_completed(&self) -> u64 {
        self.stages_completed.load(Ordering::Relaxed)
    }

    pub fn stages_failed(&self) -> u64 {
        self.stages_failed.load(Ordering::Relaxed)
    }

    pub fn retries_scheduled(&self) -> u64 {
        self.retries_scheduled.load(Ordering::Relaxed)
    }

    pub fn evaluations_run(&self) -> u64 {
        self.evaluations_run.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_emitted.store(0, Ordering::Relaxed);
        self.listener_failures.store(0, Ordering::Relaxed);
        self.stages_completed.store(0, Ordering::Relaxed);
        self.stages_failed.store(0, Ordering::Relaxed);
        self.retries_scheduled.store(0, Ordering::Relaxed);
        self.evaluations_run.store(0, Ordering::Relaxed);
    }
}

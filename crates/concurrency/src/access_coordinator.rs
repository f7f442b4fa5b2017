//! Serializes metrics and access-pattern updates against concurrent readers.
//!
//! `retrieve`/`query` take the processor's lock in shared mode (multiple
//! readers allowed) but still need to bump `access_frequency`,
//! `last_accessed`, and the EMA metrics without racing each other. Those
//! updates are small and fixed-cost, so they're funneled through one mutex
//! per processor rather than promoting the whole read path to an exclusive
//! lock.

use parking_lot::Mutex;
use tierdb_core::metrics::ProcessorMetrics;
use tracing::warn;

/// Owns one processor's mutable metrics behind a dedicated mutex, separate
/// from the processor's main read/write lock.
#[derive(Debug, Default)]
pub struct AccessCoordinator {
    metrics: Mutex<ProcessorMetrics>,
}

impl AccessCoordinator {
    /// Create a coordinator with fresh metrics.
    pub fn new() -> Self {
        AccessCoordinator::default()
    }

    /// Record one operation's outcome.
    pub fn record_operation(&self, response_time_ms: f64, was_error: bool) {
        self.metrics.lock().record_operation(response_time_ms, was_error);
        if was_error {
            warn!(response_time_ms, "operation recorded as an error");
        }
    }

    /// Snapshot the current metrics.
    pub fn snapshot(&self) -> ProcessorMetrics {
        self.metrics.lock().clone()
    }

    /// Overwrite `uptime_secs`, the one field `record_operation` doesn't
    /// touch itself (the processor derives it from its own start time).
    pub fn set_uptime_secs(&self, uptime_secs: u64) {
        self.metrics.lock().uptime_secs = uptime_secs;
    }
}

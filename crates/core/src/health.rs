//! Health status and reports, shared by the per-processor base contract and
//! the registry's health monitor.

use serde::{Deserialize, Serialize};

/// A processor's current health classification (`SPEC_FULL.md` §4.1, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Error rate and latency within bounds.
    Healthy,
    /// Average response time over 1000ms, but error rate still acceptable.
    Degraded,
    /// Error rate above 10%, or resource usage at/above 90%.
    Unhealthy,
    /// Removed from routing and not currently serving traffic.
    Offline,
}

/// Snapshot returned by `getHealth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Current classification.
    pub status: HealthStatus,
    /// Seconds since the processor was initialized.
    pub uptime_secs: u64,
    /// Fraction of configured memory in use, `0.0..=100.0`.
    pub memory_usage: f64,
    /// Fraction of available CPU in use, `0.0..=100.0`.
    pub cpu_usage: f64,
    /// Fraction of configured disk in use, `0.0..=100.0`. Always `0.0` for
    /// an in-memory-only deployment (no persistence hook configured).
    pub disk_usage: f64,
}

impl HealthReport {
    /// Whether this report should be treated as unhealthy by the registry's
    /// health monitor, independent of `status` (which a processor computes
    /// from its own error-rate/latency averages; the monitor additionally
    /// enforces the resource-usage threshold from `SPEC_FULL.md` §4.5).
    pub fn exceeds_resource_threshold(&self) -> bool {
        self.cpu_usage >= 90.0 || self.memory_usage >= 90.0
    }
}

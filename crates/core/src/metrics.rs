//! Per-processor moving-average metrics and their health classification
//! (`SPEC_FULL.md` §4.1 "Metrics update").

use crate::health::HealthStatus;
use serde::{Deserialize, Serialize};

/// Weight applied to each new response-time sample in the moving average.
pub const RESPONSE_TIME_WEIGHT: f64 = 0.1;
/// Weight applied to each new error-rate sample in the moving average.
pub const ERROR_RATE_WEIGHT: f64 = 0.05;

/// Accumulated operational metrics for a single processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorMetrics {
    /// Exponential moving average of response time, in milliseconds.
    pub average_response_time_ms: f64,
    /// Exponential moving average of the error rate, in `0.0..=1.0`.
    pub error_rate: f64,
    /// Total operations served since the processor was initialized.
    pub total_operations: u64,
    /// Total operations that resulted in an error.
    pub total_errors: u64,
    /// Seconds since the processor was initialized.
    pub uptime_secs: u64,
    /// Total accesses observed (used for throughput and classification).
    pub access_frequency: u64,
}

impl Default for ProcessorMetrics {
    fn default() -> Self {
        ProcessorMetrics {
            average_response_time_ms: 0.0,
            error_rate: 0.0,
            total_operations: 0,
            total_errors: 0,
            uptime_secs: 0,
            access_frequency: 0,
        }
    }
}

impl ProcessorMetrics {
    /// Record the outcome of one operation: update the response-time and
    /// error-rate moving averages and bump the counters.
    pub fn record_operation(&mut self, response_time_ms: f64, was_error: bool) {
        self.total_operations += 1;
        self.access_frequency += 1;
        if was_error {
            self.total_errors += 1;
        }
        self.average_response_time_ms = exponential_moving_average(
            self.average_response_time_ms,
            response_time_ms,
            RESPONSE_TIME_WEIGHT,
        );
        let error_sample = if was_error { 1.0 } else { 0.0 };
        self.error_rate =
            exponential_moving_average(self.error_rate, error_sample, ERROR_RATE_WEIGHT);
    }

    /// `access_frequency / uptime_secs`, or `0.0` if uptime is zero.
    pub fn throughput(&self) -> f64 {
        if self.uptime_secs == 0 {
            0.0
        } else {
            self.access_frequency as f64 / self.uptime_secs as f64
        }
    }

    /// Classify health from the current moving averages
    /// (`error_rate > 0.10 → Unhealthy`; `avg_response_time > 1000ms → Degraded`;
    /// else `Healthy`).
    pub fn classify_health(&self) -> HealthStatus {
        if self.error_rate > 0.10 {
            HealthStatus::Unhealthy
        } else if self.average_response_time_ms > 1000.0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// `previous * (1 - w) + sample * w`.
fn exponential_moving_average(previous: f64, sample: f64, weight: f64) -> f64 {
    previous * (1.0 - weight) + sample * weight
}

/// Aggregated metrics across every registered processor, returned by
/// `getSystemMetrics`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SystemMetrics {
    /// Number of currently registered processors.
    pub processor_count: usize,
    /// Number of processors in the hot tier.
    pub hot_processor_count: usize,
    /// Number of processors in the cold tier.
    pub cold_processor_count: usize,
    /// Sum of `record_count` across all processors.
    pub total_records: u64,
    /// Sum of `total_size` across all processors.
    pub total_size_bytes: u64,
    /// Count of processors currently classified `Unhealthy` or `Offline`.
    pub unhealthy_processor_count: usize,
}

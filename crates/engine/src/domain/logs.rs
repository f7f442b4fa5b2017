//! Logs domain: application/service log lines (`SPEC_FULL.md` §4.4).
//!
//! Retention is day-based per log level, independent of the generic
//! [`tierdb_core::record::RetentionCategory`] table: `debug` and `info`
//! collapse onto the same category cut points as that enum, but `warn`
//! (90 days) and `error` (365 days) split where the generic `Long` category
//! only has one window. This table is the source of truth for logs;
//! `RetentionCategory` on a logs record is set for display/filtering
//! purposes only and must not be used to compute expiry for this domain
//! (see [`crate::cold::ColdProcessor::store_with_retention_days`]).

use crate::cold::ColdProcessor;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::error::{Error, Result};
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::processor_meta::{Capabilities, ProcessorMetadata};
use tierdb_core::query::Filter;
use tierdb_core::record::Record;
use tierdb_core::traits::{Processor, RetentionSweeper};

/// Fixed secondary indices the logs domain always maintains.
pub fn logs_indexed_fields() -> Vec<String> {
    vec![
        "level".to_string(),
        "application".to_string(),
        "service".to_string(),
        "host".to_string(),
        "minute".to_string(),
        "hour".to_string(),
        "day".to_string(),
        "traceId".to_string(),
        "requestId".to_string(),
        "tag".to_string(),
        "errorType".to_string(),
    ]
}

/// Wraps a [`ColdProcessor`] to route expiry through
/// [`level_retention_days`] instead of the record's generic
/// `RetentionCategory`. The logs domain is cold-only: log volume makes a
/// hot, uncompressed logs processor impractical (`SPEC_FULL.md` §4.4).
pub struct LogsColdProcessor {
    inner: ColdProcessor,
}

impl LogsColdProcessor {
    /// Wrap a cold processor already constructed for the logs domain.
    pub fn new(inner: ColdProcessor) -> Self {
        LogsColdProcessor { inner }
    }

    /// Access the wrapped processor, e.g. for the retention sweeper.
    pub fn inner(&self) -> &ColdProcessor {
        &self.inner
    }
}

impl Processor for LogsColdProcessor {
    fn store(&self, record: Record) -> Result<()> {
        validate_logs_payload(&record)?;
        let level = record.data.get("level").and_then(|v| v.as_str()).unwrap_or("info");
        let days = level_retention_days(level);
        self.inner.store_with_retention_days(record, days)
    }

    fn retrieve(&self, id: &str) -> Result<Option<Record>> {
        self.inner.retrieve(id)
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<Record>> {
        self.inner.query(filters)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }

    fn get_health(&self) -> HealthReport {
        self.inner.get_health()
    }

    fn get_metrics(&self) -> ProcessorMetrics {
        self.inner.get_metrics()
    }

    fn get_metadata(&self) -> ProcessorMetadata {
        self.inner.get_metadata()
    }

    fn get_capabilities(&self) -> Capabilities {
        self.inner.get_capabilities()
    }

    fn get_configuration(&self) -> ProcessorConfig {
        self.inner.get_configuration()
    }

    fn shutdown(&self) -> Result<()> {
        self.inner.shutdown()
    }

    fn as_retention_sweeper(&self) -> Option<&dyn RetentionSweeper> {
        Some(self)
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}

impl RetentionSweeper for LogsColdProcessor {
    fn sweep_retention(&self, now: i64) -> Result<usize> {
        self.inner.sweep_retention(now)
    }
}

/// Reject a log record missing a recognized `level`, or missing either of
/// its mandatory source fields `service`/`application`.
pub fn validate_logs_payload(record: &Record) -> Result<()> {
    match record.data.get("level").and_then(|v| v.as_str()) {
        Some(level) if level_retention_days(level).is_some() || level == "fatal" => {}
        _ => {
            return Err(Error::Validation(
                "log record missing or has an unrecognized `level` (expected debug|info|warn|error|fatal)".into(),
            ))
        }
    }
    for field in ["service", "application"] {
        match record.data.get(field) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => {}
            _ => return Err(Error::Validation(format!("log record missing required source field `{field}`"))),
        }
    }
    Ok(())
}

/// Retention window for a log level, in days. `None` means never expires
/// (`fatal`).
pub fn level_retention_days(level: &str) -> Option<u32> {
    match level {
        "debug" => Some(1),
        "info" => Some(30),
        "warn" => Some(90),
        "error" => Some(365),
        "fatal" => None,
        _ => Some(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tierdb_core::domain::Domain;

    #[test]
    fn retention_table_matches_spec() {
        assert_eq!(level_retention_days("debug"), Some(1));
        assert_eq!(level_retention_days("info"), Some(30));
        assert_eq!(level_retention_days("warn"), Some(90));
        assert_eq!(level_retention_days("error"), Some(365));
        assert_eq!(level_retention_days("fatal"), None);
    }

    #[test]
    fn rejects_missing_level() {
        let record = Record::new("l1", Domain::Logs, 0, json!({"service": "api"}));
        assert!(validate_logs_payload(&record).is_err());
    }

    #[test]
    fn accepts_fatal_level() {
        let record = Record::new(
            "l1",
            Domain::Logs,
            0,
            json!({"level": "fatal", "service": "api", "application": "billing"}),
        );
        assert!(validate_logs_payload(&record).is_ok());
    }

    #[test]
    fn rejects_missing_source_fields() {
        let record = Record::new("l1", Domain::Logs, 0, json!({"level": "info", "service": "api"}));
        assert!(validate_logs_payload(&record).is_err());
    }

    fn logs_processor() -> LogsColdProcessor {
        LogsColdProcessor::new(ColdProcessor::new(
            "l1",
            Domain::Logs,
            ProcessorConfig::default(),
            logs_indexed_fields(),
            100,
            std::sync::Arc::new(tierdb_storage::NoopCompressor),
            None,
        ))
    }

    #[test]
    fn wrapped_store_rejects_invalid_payload() {
        let p = logs_processor();
        let record = Record::new("l1", Domain::Logs, 0, json!({"service": "api"}));
        assert!(p.store(record).is_err());
    }

    #[test]
    fn wrapped_store_schedules_level_specific_expiry() {
        let p = logs_processor();
        let record = Record::new(
            "l1",
            Domain::Logs,
            0,
            json!({"level": "debug", "service": "api", "application": "billing"}),
        );
        p.store(record).unwrap();
        let deleted = p.inner().sweep_retention(86_400_000 + 1).unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn indexed_fields_match_the_spec_list() {
        let fields = logs_indexed_fields();
        for expected in [
            "level",
            "application",
            "service",
            "host",
            "minute",
            "hour",
            "day",
            "traceId",
            "requestId",
            "tag",
            "errorType",
        ] {
            assert!(fields.contains(&expected.to_string()), "missing index `{expected}`");
        }
    }
}

//! Stats domain: numeric metrics and aggregates (`SPEC_FULL.md` §4.4).
//!
//! Wraps a tier processor (hot or cold, either is valid for this domain)
//! with a small cached-aggregation layer: `aggregate` memoizes its result by
//! `(metric, aggType, options)` and the cache is invalidated on any write
//! that touches the metric itself, or any other metric sharing its
//! `category`.

use dashmap::DashMap;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tierdb_core::error::{Error, Result};
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::processor_meta::{Capabilities, ProcessorMetadata};
use tierdb_core::query::Filter;
use tierdb_core::record::Record;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::traits::{Processor, RetentionSweeper};

/// Fixed secondary indices the stats domain always maintains.
pub fn stats_indexed_fields() -> Vec<String> {
    vec![
        "metric".to_string(),
        "category".to_string(),
        "source".to_string(),
        "minute".to_string(),
        "hour".to_string(),
        "day".to_string(),
        "dimension".to_string(),
        "value".to_string(),
        "tag".to_string(),
    ]
}

const AGGREGATION_LEVELS: &[&str] = &["minute", "hour", "day"];
const DATA_TYPES: &[&str] = &["counter", "gauge", "histogram"];
const ENVIRONMENTS: &[&str] = &["production", "staging", "development"];

/// Reject a stats record whose `value` isn't numeric, or whose
/// `aggregationLevel`/`dataType`/`environment` (when present) aren't one of
/// the recognized enum values.
pub fn validate_stats_payload(record: &Record) -> Result<()> {
    match record.data.get("value") {
        Some(v) if v.is_number() => {}
        Some(_) => return Err(Error::Validation("stats record field `value` must be numeric".into())),
        None => return Err(Error::Validation("stats record missing required field `value`".into())),
    }
    check_enum_field(record, "aggregationLevel", AGGREGATION_LEVELS)?;
    check_enum_field(record, "dataType", DATA_TYPES)?;
    check_enum_field(record, "environment", ENVIRONMENTS)?;
    Ok(())
}

fn check_enum_field(record: &Record, field: &str, allowed: &[&str]) -> Result<()> {
    match record.data.get(field) {
        None => Ok(()),
        Some(serde_json::Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        _ => Err(Error::Validation(format!(
            "stats record field `{field}` must be one of {allowed:?}"
        ))),
    }
}

/// In-memory cache of aggregation results keyed by `(metric, aggType,
/// options-hash)`. Invalidated wholesale for a metric on any write to that
/// metric, and transitively for every metric sharing a written record's
/// `category` (`SPEC_FULL.md` §4.4's last line).
#[derive(Default)]
pub struct StatsAggregationCache {
    entries: DashMap<String, serde_json::Value>,
    metrics_by_category: DashMap<String, HashSet<String>>,
}

impl StatsAggregationCache {
    pub fn new() -> Self {
        StatsAggregationCache::default()
    }

    fn key(metric: &str, agg_type: &str, options: &serde_json::Value) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        options.to_string().hash(&mut hasher);
        format!("{metric}\u{0}{agg_type}\u{0}{:x}", hasher.finish())
    }

    /// Cached aggregation result, if present.
    pub fn get(&self, metric: &str, agg_type: &str, options: &serde_json::Value) -> Option<serde_json::Value> {
        self.entries.get(&Self::key(metric, agg_type, options)).map(|v| v.clone())
    }

    /// Remember `value` for `(metric, aggType, options)`.
    pub fn put(&self, metric: &str, agg_type: &str, options: &serde_json::Value, value: serde_json::Value) {
        self.entries.insert(Self::key(metric, agg_type, options), value);
    }

    /// Record that `metric` (optionally in `category`) was just written to:
    /// drop every cached aggregation for `metric`, and for every other
    /// metric previously seen under the same category.
    pub fn invalidate_for_write(&self, metric: &str, category: Option<&str>) {
        self.invalidate_metric(metric);
        if let Some(category) = category {
            let mut seen = self.metrics_by_category.entry(category.to_string()).or_default();
            for m in seen.iter() {
                if m != metric {
                    self.invalidate_metric(m);
                }
            }
            seen.insert(metric.to_string());
        }
    }

    fn invalidate_metric(&self, metric: &str) {
        let prefix = format!("{metric}\u{0}");
        self.entries.retain(|k, _| !k.starts_with(&prefix));
    }
}

/// The supported reduction over a metric's numeric `value`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregationType {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(AggregationType::Sum),
            "avg" => Ok(AggregationType::Avg),
            "min" => Ok(AggregationType::Min),
            "max" => Ok(AggregationType::Max),
            "count" => Ok(AggregationType::Count),
            other => Err(Error::Validation(format!("unknown aggregation type `{other}` (expected sum|avg|min|max|count)"))),
        }
    }

    fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            AggregationType::Sum => values.iter().sum(),
            AggregationType::Avg => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            AggregationType::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            AggregationType::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            AggregationType::Count => values.len() as f64,
        }
    }
}

/// Wraps any stats-domain processor (hot or cold) with the cached
/// aggregation table. Composition, not a new tier: every other `Processor`
/// method passes straight through to `inner`.
pub struct StatsProcessor {
    inner: Arc<dyn Processor>,
    cache: StatsAggregationCache,
}

impl StatsProcessor {
    pub fn new(inner: Arc<dyn Processor>) -> Self {
        StatsProcessor {
            inner,
            cache: StatsAggregationCache::new(),
        }
    }

    /// Compute (or return the cached) aggregation of `metric`'s `value`
    /// field across every record matching `options` (currently just an
    /// optional `category` filter), memoized by `(metric, aggType,
    /// options)`.
    pub fn aggregate(&self, metric: &str, agg_type: &str, options: &serde_json::Value) -> Result<serde_json::Value> {
        if let Some(cached) = self.cache.get(metric, agg_type, options) {
            return Ok(cached);
        }
        let agg = AggregationType::parse(agg_type)?;

        let mut filters = vec![Filter::Eq {
            field: "metric".to_string(),
            value: serde_json::json!(metric),
        }];
        if let Some(category) = options.get("category").and_then(|v| v.as_str()) {
            filters.push(Filter::Eq {
                field: "category".to_string(),
                value: serde_json::json!(category),
            });
        }

        let values: Vec<f64> = self
            .inner
            .query(&filters)?
            .iter()
            .filter_map(|r| r.data.get("value").and_then(|v| v.as_f64()))
            .collect();
        let result = serde_json::json!(agg.reduce(&values));
        self.cache.put(metric, agg_type, options, result.clone());
        Ok(result)
    }

    fn metric_and_category(record: &Record) -> (Option<String>, Option<String>) {
        let metric = record.data.get("metric").and_then(|v| v.as_str()).map(str::to_string);
        let category = record.data.get("category").and_then(|v| v.as_str()).map(str::to_string);
        (metric, category)
    }
}

impl Processor for StatsProcessor {
    fn store(&self, record: Record) -> Result<()> {
        let (metric, category) = Self::metric_and_category(&record);
        self.inner.store(record)?;
        if let Some(metric) = metric {
            self.cache.invalidate_for_write(&metric, category.as_deref());
        }
        Ok(())
    }

    fn retrieve(&self, id: &str) -> Result<Option<Record>> {
        self.inner.retrieve(id)
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<Record>> {
        self.inner.query(filters)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let existing = self.inner.retrieve(id)?;
        let deleted = self.inner.delete(id)?;
        if deleted {
            if let Some(record) = existing {
                let (metric, category) = Self::metric_and_category(&record);
                if let Some(metric) = metric {
                    self.cache.invalidate_for_write(&metric, category.as_deref());
                }
            }
        }
        Ok(deleted)
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
        self.inner.as_retention_sweeper()
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tierdb_core::domain::Domain;

    #[test]
    fn rejects_non_numeric_value() {
        let record = Record::new("s1", Domain::Stats, 0, json!({"metric": "latency", "value": "fast"}));
        assert!(validate_stats_payload(&record).is_err());
    }

    #[test]
    fn accepts_numeric_value() {
        let record = Record::new("s1", Domain::Stats, 0, json!({"metric": "latency", "value": 12.5}));
        assert!(validate_stats_payload(&record).is_ok());
    }

    #[test]
    fn rejects_unrecognized_aggregation_level() {
        let record = Record::new(
            "s1",
            Domain::Stats,
            0,
            json!({"metric": "latency", "value": 1, "aggregationLevel": "weekly"}),
        );
        assert!(validate_stats_payload(&record).is_err());
    }

    #[test]
    fn accepts_recognized_enum_fields() {
        let record = Record::new(
            "s1",
            Domain::Stats,
            0,
            json!({
                "metric": "latency",
                "value": 1,
                "aggregationLevel": "hour",
                "dataType": "gauge",
                "environment": "production",
            }),
        );
        assert!(validate_stats_payload(&record).is_ok());
    }

    fn stats_processor() -> StatsProcessor {
        use crate::hot::HotProcessor;
        let hot = HotProcessor::new("s1", Domain::Stats, ProcessorConfig::default(), stats_indexed_fields(), None);
        StatsProcessor::new(Arc::new(hot))
    }

    #[test]
    fn aggregate_sums_matching_metric_values() {
        let p = stats_processor();
        p.store(Record::new("r1", Domain::Stats, 0, json!({"metric": "latency", "value": 10}))).unwrap();
        p.store(Record::new("r2", Domain::Stats, 0, json!({"metric": "latency", "value": 20}))).unwrap();
        let total = p.aggregate("latency", "sum", &json!({})).unwrap();
        assert_eq!(total, json!(30.0));
    }

    #[test]
    fn aggregate_result_is_cached_until_a_write_invalidates_it() {
        let p = stats_processor();
        p.store(Record::new("r1", Domain::Stats, 0, json!({"metric": "latency", "value": 10}))).unwrap();
        assert_eq!(p.aggregate("latency", "sum", &json!({})).unwrap(), json!(10.0));

        p.store(Record::new("r2", Domain::Stats, 0, json!({"metric": "latency", "value": 90}))).unwrap();
        assert_eq!(p.aggregate("latency", "sum", &json!({})).unwrap(), json!(100.0));
    }

    #[test]
    fn writing_one_metric_invalidates_another_sharing_its_category() {
        let p = stats_processor();
        p.store(Record::new("r1", Domain::Stats, 0, json!({"metric": "latency", "category": "perf", "value": 10})))
            .unwrap();
        p.store(Record::new("r2", Domain::Stats, 0, json!({"metric": "errors", "category": "perf", "value": 1})))
            .unwrap();
        let options = json!({"category": "perf"});
        assert_eq!(p.aggregate("errors", "count", &options).unwrap(), json!(1.0));

        // A new write to `latency` (same category) must invalidate the
        // cached `errors` aggregation too, even though `errors` itself
        // wasn't written.
        p.store(Record::new("r3", Domain::Stats, 0, json!({"metric": "latency", "category": "perf", "value": 5})))
            .unwrap();
        p.store(Record::new("r4", Domain::Stats, 0, json!({"metric": "errors", "category": "perf", "value": 1})))
            .unwrap();
        assert_eq!(p.aggregate("errors", "count", &options).unwrap(), json!(2.0));
    }

    #[test]
    fn indexed_fields_match_the_spec_list() {
        let fields = stats_indexed_fields();
        for expected in ["metric", "category", "source", "minute", "hour", "day", "dimension", "value", "tag"] {
            assert!(fields.contains(&expected.to_string()), "missing index `{expected}`");
        }
    }
}

//! Query types shared by processors and the registry.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A filter predicate against a record field.
///
/// Processors accelerate `Eq` lookups on indexed fields; anything else
/// falls back to a full scan filtered in-memory (`SPEC_FULL.md` §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value exactly. Index-accelerated when `field` names an
    /// indexed column.
    Eq { field: String, value: serde_json::Value },
    /// Field's numeric value falls in `[min, max]`.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// All of the nested filters must match.
    And(Vec<Filter>),
}

/// Caller-controlled options for a single query.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryOptions {
    /// Cap on returned records. `None` means unbounded.
    pub limit: Option<usize>,
    /// How many replicas to fan a domain query out to. `1` (default)
    /// selects a single replica via the load-balancing policy; higher
    /// values read from multiple replicas for eventually-consistent reads.
    pub replica_count: Option<usize>,
}

/// A query submitted to the registry (`SPEC_FULL.md` §2, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// `None` fans the query out to every registered processor.
    pub domain: Option<Domain>,
    /// Predicates combined with implicit AND.
    pub filters: Vec<Filter>,
    /// Caller-controlled options.
    pub options: QueryOptions,
}

impl Query {
    /// A query with no filters, routed by domain.
    pub fn for_domain(domain: Domain) -> Self {
        Query {
            domain: Some(domain),
            filters: Vec::new(),
            options: QueryOptions::default(),
        }
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Per-replica metadata returned alongside query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResultMetadata {
    /// Wall-clock time the processor spent executing the query, in millis.
    pub execution_time_ms: f64,
    /// Which processor produced this slice of the aggregated result.
    pub processor_id: String,
    /// Whether the result was served from a cached aggregation (stats
    /// domain only; always `false` elsewhere).
    pub cache_hit: bool,
    /// Names of the indices used to accelerate the query, if any.
    pub indexes_used: Vec<String>,
}

/// One processor's contribution to an aggregated query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Matching records, as opaque JSON.
    pub data: Vec<serde_json::Value>,
    /// Total matches found on this processor (before any `limit`).
    pub total_count: usize,
    /// Execution metadata.
    pub metadata: QueryResultMetadata,
}

/// The registry's aggregated response to a [`Query`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AggregatedQueryResult {
    /// Per-replica results, successful replicas only
    /// (`SPEC_FULL.md` §4.5 "Failure semantics").
    pub results: Vec<QueryResult>,
    /// Set when the query's deadline expired before every replica replied;
    /// `results` then holds whatever replicas had already completed.
    pub partial: bool,
    /// Processor ids whose individual query failed and were skipped.
    pub failed_processor_ids: Vec<String>,
}

impl AggregatedQueryResult {
    /// Total records across every successful replica.
    pub fn total_records(&self) -> usize {
        self.results.iter().map(|r| r.data.len()).sum()
    }
}

/// Hash of a stats-domain aggregation request, used as the cache key for
/// the domain's invalidate-on-write aggregation table (`SPEC_FULL.md` §4.4).
pub fn aggregation_cache_key(metric: &str, agg_type: &str, options: &HashMap<String, String>) -> String {
    let mut entries: Vec<(&String, &String)> = options.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut key = format!("{metric}:{agg_type}");
    for (k, v) in entries {
        key.push(':');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_cache_key_is_order_independent() {
        let mut a = HashMap::new();
        a.insert("env".to_string(), "prod".to_string());
        a.insert("region".to_string(), "us".to_string());

        let mut b = HashMap::new();
        b.insert("region".to_string(), "us".to_string());
        b.insert("env".to_string(), "prod".to_string());

        assert_eq!(
            aggregation_cache_key("latency", "avg", &a),
            aggregation_cache_key("latency", "avg", &b)
        );
    }

    #[test]
    fn aggregated_result_totals_successful_replicas_only() {
        let result = AggregatedQueryResult {
            results: vec![QueryResult {
                data: vec![serde_json::json!({"id": "1"})],
                total_count: 1,
                metadata: QueryResultMetadata {
                    execution_time_ms: 1.0,
                    processor_id: "p1".into(),
                    cache_hit: false,
                    indexes_used: vec![],
                },
            }],
            partial: false,
            failed_processor_ids: vec!["p2".into()],
        };
        assert_eq!(result.total_records(), 1);
    }
}

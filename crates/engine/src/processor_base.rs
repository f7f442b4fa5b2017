//! Shared CRUD/indexing/eviction/metrics/lifecycle logic used by every
//! domain and tier specialization (`SPEC_FULL.md` §4.1).
//!
//! Domain specializations (`crate::domain`) hold a `ProcessorBase` and add
//! fixed indices plus payload validation on top; tier specializations
//! (`crate::hot`, `crate::cold`) add compression, batching, and the
//! retention queue. Composition over inheritance, per `SPEC_FULL.md` §9.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tierdb_concurrency::AccessCoordinator;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::domain::Domain;
use tierdb_core::error::Result;
use tierdb_core::events::{EventBus, ProcessorEvent};
use tierdb_core::health::{HealthReport, HealthStatus};
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::migration::{MigrationPlan, ProcessorState};
use tierdb_core::now_millis;
use tierdb_core::processor_meta::ProcessorMetadata;
use tierdb_core::query::Filter;
use tierdb_core::record::{AccessType, Record};
use tierdb_core::tier::{PerformanceTier, Tier};
use tierdb_core::traits::PersistenceHook;
use tierdb_storage::IndexSet;
use tracing::instrument;

/// The part of a processor's behavior that's identical across every domain
/// and tier: storage, indexing, eviction, metrics, and lifecycle.
pub struct ProcessorBase {
    id: String,
    domain: Domain,
    tier: Tier,
    performance_tier: PerformanceTier,
    config: RwLock<ProcessorConfig>,
    state: RwLock<ProcessorState>,
    created_at: i64,
    updated_at: RwLock<i64>,
    records: RwLock<HashMap<String, Record>>,
    indices: RwLock<IndexSet>,
    indexed_fields: Vec<String>,
    access: AccessCoordinator,
    persistence: Option<Arc<dyn PersistenceHook>>,
    events: EventBus<ProcessorEvent>,
    start: Instant,
    migration_history: RwLock<Vec<MigrationPlan>>,
}

impl ProcessorBase {
    /// Construct a new base in the `Created` state, immediately advanced to
    /// `Healthy` (there is no real warm-up work for an in-memory store).
    pub fn new(
        id: impl Into<String>,
        domain: Domain,
        tier: Tier,
        performance_tier: PerformanceTier,
        config: ProcessorConfig,
        indexed_fields: Vec<String>,
        persistence: Option<Arc<dyn PersistenceHook>>,
    ) -> Self {
        let now = now_millis();
        ProcessorBase {
            id: id.into(),
            domain,
            tier,
            performance_tier,
            indices: RwLock::new(IndexSet::new(indexed_fields.clone())),
            indexed_fields,
            config: RwLock::new(config),
            state: RwLock::new(ProcessorState::Healthy),
            created_at: now,
            updated_at: RwLock::new(now),
            records: RwLock::new(HashMap::new()),
            access: AccessCoordinator::new(),
            persistence,
            events: EventBus::new(),
            start: Instant::now(),
            migration_history: RwLock::new(Vec::new()),
        }
    }

    /// This processor's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe to this processor's event stream.
    pub fn on_event(&self, handler: impl Fn(&ProcessorEvent) + Send + Sync + 'static) {
        self.events.subscribe(handler);
    }

    /// Publish an event on this processor's bus. Used by tier
    /// specializations (batching, retention sweep) for events that
    /// originate above the base CRUD layer.
    pub fn publish_event(&self, event: ProcessorEvent) {
        self.events.publish(event);
    }

    /// Insert or overwrite `record`, evicting the least-recently-accessed
    /// record first if at capacity (`SPEC_FULL.md` §4.1 "Eviction").
    #[instrument(skip(self, record), fields(processor_id = %self.id, domain = %self.domain))]
    pub fn store(&self, mut record: Record) -> Result<()> {
        let start = Instant::now();
        let config = self.config.read().clone();
        let is_new = {
            let records = self.records.read();
            !records.contains_key(&record.id)
        };

        if is_new && self.records.read().len() >= config.max_records {
            self.evict_batch(config.max_records);
        }

        if is_new {
            record.metadata.access_pattern.record_access(now_millis(), AccessType::Write);
        }

        self.index_record(&record);
        self.records.write().insert(record.id.clone(), record.clone());
        *self.updated_at.write() = now_millis();

        if let Some(hook) = &self.persistence {
            hook.save_record(&self.id, &record)?;
        }

        self.access.record_operation(start.elapsed().as_secs_f64() * 1000.0, false);
        self.events.publish(ProcessorEvent::RecordStored {
            processor_id: self.id.clone(),
            record_id: record.id,
        });
        Ok(())
    }

    /// Look up `id`, recording a read access on hit.
    #[instrument(skip(self), fields(processor_id = %self.id, domain = %self.domain))]
    pub fn retrieve(&self, id: &str) -> Result<Option<Record>> {
        let start = Instant::now();
        let found = {
            let mut records = self.records.write();
            records.get_mut(id).map(|r| {
                r.metadata.access_pattern.record_access(now_millis(), AccessType::Read);
                r.clone()
            })
        };
        self.access.record_operation(start.elapsed().as_secs_f64() * 1000.0, false);
        if found.is_some() {
            self.events.publish(ProcessorEvent::RecordRetrieved {
                processor_id: self.id.clone(),
                record_id: id.to_string(),
            });
        }
        Ok(found)
    }

    /// Evaluate `filters` against every record, index-accelerating a
    /// top-level `Eq` on an indexed field.
    #[instrument(skip(self, filters), fields(processor_id = %self.id, domain = %self.domain))]
    pub fn query(&self, filters: &[Filter]) -> Result<Vec<Record>> {
        let start = Instant::now();
        let candidate_ids = self.candidate_ids(filters);
        let mut records = self.records.write();
        let now = now_millis();

        let matched: Vec<Record> = match candidate_ids {
            Some(ids) => ids
                .into_iter()
                .filter_map(|id| records.get_mut(&id))
                .filter(|r| matches_all(r, filters))
                .map(|r| {
                    r.metadata.access_pattern.record_access(now, AccessType::Read);
                    r.clone()
                })
                .collect(),
            None => records
                .values_mut()
                .filter(|r| matches_all(r, filters))
                .map(|r| {
                    r.metadata.access_pattern.record_access(now, AccessType::Read);
                    r.clone()
                })
                .collect(),
        };

        self.access.record_operation(start.elapsed().as_secs_f64() * 1000.0, false);
        self.events.publish(ProcessorEvent::QueryExecuted {
            processor_id: self.id.clone(),
            result_count: matched.len(),
        });
        Ok(matched)
    }

    /// Remove `id` from the store and every index. Returns whether a
    /// record actually existed.
    #[instrument(skip(self), fields(processor_id = %self.id, domain = %self.domain))]
    pub fn delete(&self, id: &str) -> Result<bool> {
        let start = Instant::now();
        let removed = self.records.write().remove(id);
        let existed = removed.is_some();
        if let Some(record) = removed {
            self.unindex_record(&record);
        }
        *self.updated_at.write() = now_millis();
        self.access.record_operation(start.elapsed().as_secs_f64() * 1000.0, false);
        if existed {
            self.events.publish(ProcessorEvent::RecordDeleted {
                processor_id: self.id.clone(),
                record_id: id.to_string(),
            });
        }
        Ok(existed)
    }

    /// Current health snapshot.
    pub fn health(&self) -> HealthReport {
        let metrics = self.access.snapshot();
        let status = if *self.state.read() == ProcessorState::Unhealthy {
            HealthStatus::Unhealthy
        } else {
            metrics.classify_health()
        };
        HealthReport {
            status,
            uptime_secs: self.start.elapsed().as_secs(),
            memory_usage: 0.0,
            cpu_usage: 0.0,
            disk_usage: 0.0,
        }
    }

    /// Current operational metrics, with `uptime_secs` refreshed.
    pub fn metrics(&self) -> ProcessorMetrics {
        self.access.set_uptime_secs(self.start.elapsed().as_secs());
        self.access.snapshot()
    }

    /// Full metadata snapshot.
    pub fn metadata(&self) -> ProcessorMetadata {
        let records = self.records.read();
        let total_size: u64 = records.values().filter_map(|r| r.metadata.size).sum();
        let last_accessed = records
            .values()
            .map(|r| r.metadata.access_pattern.last_accessed)
            .max()
            .unwrap_or(0);
        let metrics = self.metrics();
        ProcessorMetadata {
            id: self.id.clone(),
            domain: self.domain,
            tier: self.tier,
            performance_tier: self.performance_tier,
            health_status: self.health().status,
            access_frequency: metrics.access_frequency,
            last_accessed,
            record_count: records.len() as u64,
            total_size,
            endpoint: self.id.clone(),
            created_at: self.created_at,
            updated_at: *self.updated_at.read(),
            configuration: self.config.read().clone(),
            metrics,
            migration_history: self.migration_history.read().clone(),
            related_processor_ids: Default::default(),
            tags: Default::default(),
        }
    }

    /// Effective configuration.
    pub fn configuration(&self) -> ProcessorConfig {
        self.config.read().clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessorState {
        *self.state.read()
    }

    /// Force the lifecycle state, used by the registry's health monitor and
    /// migration orchestrator.
    pub fn set_state(&self, state: ProcessorState) {
        *self.state.write() = state;
    }

    /// Record a completed or failed migration against this processor's
    /// history.
    pub fn record_migration(&self, plan: MigrationPlan) {
        self.migration_history.write().push(plan);
    }

    /// Current record count.
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Snapshot every record currently stored, for migration copy steps.
    pub fn all_records(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }

    /// Flush nothing (no buffered state at this layer) and emit `shutdown`.
    pub fn shutdown(&self) -> Result<()> {
        self.set_state(ProcessorState::Terminated);
        self.events.publish(ProcessorEvent::Shutdown {
            processor_id: self.id.clone(),
        });
        Ok(())
    }

    /// Evict the oldest-by-`lastAccessed` `ceil(0.1 * max_records)` records,
    /// skipping `Permanent` ones (`SPEC_FULL.md` §8 "Boundary behaviors").
    fn evict_batch(&self, max_records: usize) {
        let quota = ((max_records + 9) / 10).max(1);
        let victims: Vec<String> = {
            let records = self.records.read();
            let mut evictable: Vec<&Record> = records
                .values()
                .filter(|r| r.metadata.retention != tierdb_core::record::RetentionCategory::Permanent)
                .collect();
            evictable.sort_by_key(|r| r.metadata.access_pattern.last_accessed);
            evictable.into_iter().take(quota).map(|r| r.id.clone()).collect()
        };
        for id in victims {
            let _ = self.delete(&id);
        }
    }

    fn index_record(&self, record: &Record) {
        let mut indices = self.indices.write();
        for field in &self.indexed_fields {
            for value in field_values(record, field) {
                indices.insert(field, &value, &record.id);
            }
        }
    }

    fn unindex_record(&self, record: &Record) {
        let mut indices = self.indices.write();
        for field in &self.indexed_fields {
            for value in field_values(record, field) {
                indices.remove(field, &value, &record.id);
            }
        }
    }

    /// If the top-level filter is an `Eq` on an indexed field, return the
    /// candidate id set from the index instead of scanning every record.
    fn candidate_ids(&self, filters: &[Filter]) -> Option<Vec<String>> {
        for filter in filters {
            if let Filter::Eq { field, value } = filter {
                let indices = self.indices.read();
                if indices.has_index(field) {
                    let text = json_to_index_key(value);
                    return Some(indices.lookup(field, &text));
                }
            }
        }
        None
    }
}

/// Time-bucket index names a domain specialization can declare
/// (`SPEC_FULL.md` §4.4's `{minute,hour,day}` indices): derived from
/// `record.timestamp` rather than looked up in `record.data`, since no
/// producer is expected to supply these explicitly.
fn time_bucket(record: &Record, field: &str) -> Option<String> {
    let bucket_ms: i64 = match field {
        "minute" => 60_000,
        "hour" => 3_600_000,
        "day" => 86_400_000,
        _ => return None,
    };
    Some((record.timestamp.max(0) / bucket_ms).to_string())
}

/// Every value a field contributes to an index for one record. A plain
/// scalar field contributes its one value; a JSON array field contributes
/// one entry per element (e.g. a user's `permission` list, or a `tag`
/// array), so a multi-valued attribute indexes as `value -> set<record id>`
/// the same way a scalar one does (`SPEC_FULL.md` §4.4's `permission ->
/// set<userId>`).
fn field_values(record: &Record, field: &str) -> Vec<String> {
    if let Some(bucket) = time_bucket(record, field) {
        return vec![bucket];
    }
    match record.data.get(field) {
        Some(serde_json::Value::Array(items)) => items.iter().map(json_to_index_key).collect(),
        Some(value) => vec![json_to_index_key(value)],
        None => Vec::new(),
    }
}

fn json_to_index_key(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_all(record: &Record, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_one(record, f))
}

fn matches_one(record: &Record, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { field, value } => match record.data.get(field) {
            Some(serde_json::Value::Array(items)) => items.contains(value),
            other => other == Some(value),
        },
        Filter::Range { field, min, max } => {
            let Some(n) = record.data.get(field).and_then(|v| v.as_f64()) else {
                return false;
            };
            min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
        }
        Filter::And(nested) => nested.iter().all(|f| matches_one(record, f)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tierdb_core::config::ProcessorConfig;

    fn base() -> ProcessorBase {
        ProcessorBase::new(
            "p1",
            Domain::User,
            Tier::Hot,
            PerformanceTier::Realtime,
            ProcessorConfig {
                max_records: 2,
                ..ProcessorConfig::default()
            },
            vec!["email".to_string()],
            None,
        )
    }

    #[test]
    fn store_then_retrieve_round_trips() {
        let base = base();
        base.store(Record::new("r1", Domain::User, 0, json!({"email": "a@example.com"})))
            .unwrap();
        let found = base.retrieve("r1").unwrap().unwrap();
        assert_eq!(found.id, "r1");
    }

    #[test]
    fn eviction_drops_least_recently_accessed_at_capacity() {
        let base = base();
        base.store(Record::new("r1", Domain::User, 0, json!({}))).unwrap();
        base.store(Record::new("r2", Domain::User, 0, json!({}))).unwrap();
        // r1 is now the least-recently-accessed; inserting r3 should evict it.
        base.store(Record::new("r3", Domain::User, 0, json!({}))).unwrap();
        assert_eq!(base.record_count(), 2);
        assert!(base.retrieve("r1").unwrap().is_none());
    }

    #[test]
    fn eviction_batch_is_ten_percent_of_capacity_rounded_up() {
        let base = ProcessorBase::new(
            "p1",
            Domain::User,
            Tier::Hot,
            PerformanceTier::Realtime,
            ProcessorConfig {
                max_records: 20,
                ..ProcessorConfig::default()
            },
            vec![],
            None,
        );
        for i in 0..20 {
            base.store(Record::new(format!("r{i}"), Domain::User, 0, json!({}))).unwrap();
        }
        // At capacity; one more store evicts ceil(0.1 * 20) = 2 oldest records,
        // leaving 19 (18 survivors + the new one).
        base.store(Record::new("r20", Domain::User, 0, json!({}))).unwrap();
        assert_eq!(base.record_count(), 19);
    }

    #[test]
    fn query_uses_index_for_indexed_eq_filter() {
        let base = base();
        base.store(Record::new("r1", Domain::User, 0, json!({"email": "a@example.com"})))
            .unwrap();
        base.store(Record::new("r2", Domain::User, 0, json!({"email": "b@example.com"})))
            .unwrap();
        let results = base
            .query(&[Filter::Eq {
                field: "email".to_string(),
                value: json!("a@example.com"),
            }])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "r1");
    }

    #[test]
    fn time_bucket_indices_group_records_by_day() {
        let base = ProcessorBase::new(
            "p1",
            Domain::Logs,
            Tier::Cold,
            PerformanceTier::Standard,
            ProcessorConfig::default(),
            vec!["day".to_string()],
            None,
        );
        base.store(Record::new("r1", Domain::Logs, 0, json!({}))).unwrap();
        base.store(Record::new("r2", Domain::Logs, 86_400_000, json!({}))).unwrap();
        let same_day = base
            .query(&[Filter::Eq {
                field: "day".to_string(),
                value: json!(0),
            }])
            .unwrap();
        assert_eq!(same_day.len(), 1);
        assert_eq!(same_day[0].id, "r1");
    }

    #[test]
    fn array_valued_field_indexes_each_element() {
        let base = ProcessorBase::new(
            "p1",
            Domain::User,
            Tier::Hot,
            PerformanceTier::Realtime,
            ProcessorConfig::default(),
            vec!["permission".to_string()],
            None,
        );
        base.store(Record::new("u1", Domain::User, 0, json!({"permission": ["read", "write"]})))
            .unwrap();
        base.store(Record::new("u2", Domain::User, 0, json!({"permission": ["read"]}))).unwrap();

        let readers = base
            .query(&[Filter::Eq {
                field: "permission".to_string(),
                value: json!("read"),
            }])
            .unwrap();
        assert_eq!(readers.len(), 2);

        assert!(base.delete("u1").unwrap());
        let readers = base
            .query(&[Filter::Eq {
                field: "permission".to_string(),
                value: json!("read"),
            }])
            .unwrap();
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].id, "u2");
    }

    #[test]
    fn delete_removes_record_and_index_entry() {
        let base = base();
        base.store(Record::new("r1", Domain::User, 0, json!({"email": "a@example.com"})))
            .unwrap();
        assert!(base.delete("r1").unwrap());
        assert!(!base.delete("r1").unwrap());
        let results = base
            .query(&[Filter::Eq {
                field: "email".to_string(),
                value: json!("a@example.com"),
            }])
            .unwrap();
        assert!(results.is_empty());
    }
}

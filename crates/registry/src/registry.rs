//! The registry: processor lifecycle, routing, query fan-out, and the
//! health/classifier/migration background loops (`SPEC_FULL.md` §4.5, §6).
//!
//! Grounded on the teacher's `PrimitiveRegistry` for the registration and
//! lookup shape (`storage/src/registry.rs`) and its `BackgroundScheduler`
//! (`engine/src/background.rs`, now `crate::` via `tierdb_engine`) for
//! running the three maintenance loops without a thread per loop.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tierdb_concurrency::LockTable;
use tierdb_core::config::{LoadBalancingStrategy, ProcessorConfig, RegistryConfig};
use tierdb_core::domain::Domain;
use tierdb_core::error::{Error, Result};
use tierdb_core::events::{EventBus, RegistryEvent};
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::SystemMetrics;
use tierdb_core::migration::{MigrationPlan, ProcessorState};
use tierdb_core::now_millis;
use tierdb_core::processor_meta::ProcessorMetadata;
use tierdb_core::query::{AggregatedQueryResult, Query, QueryResult, QueryResultMetadata};
use tierdb_core::record::Record;
use tierdb_core::tier::Tier;
use tierdb_core::traits::{Processor, ProcessorFactory, RetentionSweeper};
use tierdb_durability::MigrationJournal;
use tierdb_engine::{BackgroundScheduler, TaskPriority};
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::load_balancing::{self, Candidate};
use crate::routing::RoutingTable;

/// Cold-tier batches commit on this fixed cadence even if they never reach
/// their size threshold (`SPEC_FULL.md` §4.3). Unlike `health_check_interval`
/// this isn't part of `RegistryConfig` — the spec ties it to the batch
/// contract itself, not to deployment-level tuning.
const BATCH_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// The registry: owns every processor, routes traffic to them, and runs the
/// health/classifier/migration maintenance loops.
pub struct Registry {
    processors: DashMap<String, Arc<dyn Processor>>,
    states: DashMap<String, ProcessorState>,
    domains: DashMap<String, Domain>,
    tiers: DashMap<String, Tier>,
    routing: RoutingTable,
    factories: DashMap<(Domain, Tier), Arc<dyn ProcessorFactory>>,
    locks: LockTable,
    journal: Arc<MigrationJournal>,
    events: EventBus<RegistryEvent>,
    config: RwLock<RegistryConfig>,
    last_migration: DashMap<String, i64>,
    scheduler: Arc<BackgroundScheduler>,
    loop_stop: Arc<AtomicBool>,
    loop_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Registry {
    /// Build a registry with the given configuration and a two-worker
    /// background scheduler backing its maintenance loops.
    pub fn new(config: RegistryConfig) -> Self {
        Registry {
            processors: DashMap::new(),
            states: DashMap::new(),
            domains: DashMap::new(),
            tiers: DashMap::new(),
            routing: RoutingTable::new(),
            factories: DashMap::new(),
            locks: LockTable::new(),
            journal: Arc::new(MigrationJournal::new()),
            events: EventBus::new(),
            config: RwLock::new(config),
            last_migration: DashMap::new(),
            scheduler: Arc::new(BackgroundScheduler::new(2, 4096)),
            loop_stop: Arc::new(AtomicBool::new(false)),
            loop_handles: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to the registry's event stream.
    pub fn on_event(&self, handler: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.events.subscribe(handler);
    }

    /// Every migration plan ever recorded, durable independent of whether
    /// the processors it names still exist.
    pub fn migration_history(&self) -> Vec<MigrationPlan> {
        self.journal.history()
    }

    // ---- registration --------------------------------------------------

    /// Register the factory responsible for building processors for
    /// `(domain, tier)`.
    pub fn register_factory(&self, domain: Domain, tier: Tier, factory: Arc<dyn ProcessorFactory>) {
        self.factories.insert((domain, tier), factory);
    }

    /// Insert an already-constructed processor under `id`, wiring it into
    /// routing. Used directly by tests and by the migration orchestrator;
    /// most callers want [`Registry::create_and_register`].
    pub fn register_processor(&self, id: impl Into<String>, domain: Domain, tier: Tier, processor: Arc<dyn Processor>) {
        let id = id.into();
        self.processors.insert(id.clone(), processor);
        self.states.insert(id.clone(), ProcessorState::Healthy);
        self.domains.insert(id.clone(), domain);
        self.tiers.insert(id.clone(), tier);
        self.routing.insert(domain, tier, &id);
        info!(processor_id = %id, %domain, %tier, "processor registered");
        self.events.publish(RegistryEvent::Registered { processor_id: id });
    }

    /// Build a processor for `(domain, tier)` via its registered factory
    /// and register it under `id`.
    pub fn create_and_register(&self, id: impl Into<String>, domain: Domain, tier: Tier, config: ProcessorConfig) -> Result<String> {
        let id = id.into();
        let factory = self
            .factories
            .get(&(domain, tier))
            .ok_or_else(|| Error::InvalidConfiguration(format!("no factory registered for {domain}/{tier}")))?
            .clone();
        let processor = factory.create(&id, config)?;
        self.register_processor(id.clone(), domain, tier, processor);
        Ok(id)
    }

    /// Remove `id` from the registry: drop its routing entries, its lock,
    /// and call its `shutdown`.
    pub fn unregister_processor(&self, id: &str) -> Result<()> {
        let (_, processor) = self
            .processors
            .remove(id)
            .ok_or_else(|| Error::ProcessorNotFound(id.to_string()))?;
        if let Some((_, domain)) = self.domains.remove(id) {
            if let Some((_, tier)) = self.tiers.remove(id) {
                self.routing.remove(domain, tier, id);
            }
        }
        self.states.remove(id);
        self.locks.remove(id);
        processor.shutdown()?;
        info!(processor_id = %id, "processor unregistered");
        self.events.publish(RegistryEvent::Unregistered {
            processor_id: id.to_string(),
        });
        Ok(())
    }

    /// Look up a processor directly by id.
    pub fn get_processor(&self, id: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(id).map(|p| p.clone())
    }

    /// Every id routed for `domain` whose registry-tracked state is
    /// currently routable.
    pub fn routable_ids(&self, domain: Domain) -> Vec<String> {
        self.routing
            .domain_ids(domain)
            .into_iter()
            .filter(|id| {
                self.states
                    .get(id)
                    .map(|s| s.is_routable())
                    .unwrap_or(false)
            })
            .collect()
    }

    // ---- request routing -------------------------------------------------

    /// Select one routable replica for `domain` using `strategy` (falling
    /// back to the registry's configured default).
    pub fn select_processor(&self, domain: Domain, strategy: Option<LoadBalancingStrategy>) -> Result<String> {
        let strategy = strategy.unwrap_or_else(|| self.config.read().load_balancing_strategy);
        let ids = self.routable_ids(domain);
        let snapshots: Vec<(String, ProcessorMetadata, HealthReport)> = ids
            .iter()
            .filter_map(|id| {
                let processor = self.get_processor(id)?;
                let meta = processor.get_metadata();
                let health = HealthReport {
                    status: meta.health_status,
                    uptime_secs: 0,
                    memory_usage: 0.0,
                    cpu_usage: 0.0,
                    disk_usage: 0.0,
                };
                Some((id.clone(), meta, health))
            })
            .collect();
        let candidates: Vec<Candidate> = snapshots
            .iter()
            .map(|(id, meta, health)| Candidate {
                id: id.as_str(),
                metrics: &meta.metrics,
                health,
            })
            .collect();
        load_balancing::select(strategy, domain, &candidates, &self.routing)
            .map(str::to_string)
            .ok_or_else(|| Error::NoProcessorsAvailable(domain.to_string()))
    }

    /// Select a replica for `domain` and store `record` on it.
    #[instrument(skip(self, record), fields(domain = %domain, processor_id = tracing::field::Empty))]
    pub fn store(&self, domain: Domain, record: Record) -> Result<String> {
        tierdb_engine::domain::validate_for_domain(domain, &record)?;
        let id = self.select_processor(domain, None)?;
        Span::current().record("processor_id", id.as_str());
        let lock = self.locks.get(&id);
        let _guard = lock.write();
        self.get_processor(&id)
            .ok_or_else(|| Error::ProcessorNotFound(id.clone()))?
            .store(record)?;
        Ok(id)
    }

    /// Retrieve a record by id from a specific processor.
    #[instrument(skip(self), fields(processor_id = %processor_id, domain = %self.domain_of(processor_id)))]
    pub fn retrieve(&self, processor_id: &str, id: &str) -> Result<Option<Record>> {
        let lock = self.locks.get(processor_id);
        let _guard = lock.read();
        self.get_processor(processor_id)
            .ok_or_else(|| Error::ProcessorNotFound(processor_id.to_string()))?
            .retrieve(id)
    }

    /// Delete a record by id from a specific processor.
    #[instrument(skip(self), fields(processor_id = %processor_id, domain = %self.domain_of(processor_id)))]
    pub fn delete(&self, processor_id: &str, id: &str) -> Result<bool> {
        let lock = self.locks.get(processor_id);
        let _guard = lock.write();
        self.get_processor(processor_id)
            .ok_or_else(|| Error::ProcessorNotFound(processor_id.to_string()))?
            .delete(id)
    }

    /// This processor's domain, as tracked by the registry, or `"unknown"`
    /// if it isn't (or is no longer) registered. Used only to tag log spans.
    fn domain_of(&self, processor_id: &str) -> String {
        self.domains
            .get(processor_id)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Run `query` across every matching replica, skipping (not failing on)
    /// individual processor errors (`SPEC_FULL.md` §4.5 "Failure semantics").
    #[instrument(skip(self, query), fields(domain = ?query.domain))]
    pub fn query(&self, query: Query) -> AggregatedQueryResult {
        let target_ids = match query.domain {
            Some(domain) => {
                let replicas = query.options.replica_count.unwrap_or(1).max(1);
                let mut ids = self.routable_ids(domain);
                ids.truncate(replicas);
                ids
            }
            None => self.routing.all_ids(),
        };

        let mut results = Vec::new();
        let mut failed = Vec::new();
        for id in target_ids {
            let Some(processor) = self.get_processor(&id) else {
                failed.push(id);
                continue;
            };
            let lock = self.locks.get(&id);
            let _guard = lock.read();
            let start = std::time::Instant::now();
            match processor.query(&query.filters) {
                Ok(records) => {
                    let total_count = records.len();
                    let mut data: Vec<serde_json::Value> = records.into_iter().map(|r| r.data).collect();
                    if let Some(limit) = query.options.limit {
                        data.truncate(limit);
                    }
                    results.push(QueryResult {
                        data,
                        total_count,
                        metadata: QueryResultMetadata {
                            execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
                            processor_id: id,
                            cache_hit: false,
                            indexes_used: Vec::new(),
                        },
                    });
                }
                Err(e) => {
                    warn!(replica_id = %id, error = %e, "query failed on replica, skipping it");
                    failed.push(id);
                }
            }
        }

        AggregatedQueryResult {
            results,
            partial: false,
            failed_processor_ids: failed,
        }
    }

    // ---- maintenance loops ----------------------------------------------

    /// Poll every processor's health, demoting/removing unhealthy ones from
    /// routing and re-admitting recovered ones (`SPEC_FULL.md` §4.5).
    pub fn health_monitor_tick(&self) {
        let ids: Vec<String> = self.processors.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let Some(processor) = self.get_processor(&id) else { continue };
            let report = processor.get_health();
            let was_unhealthy = self.states.get(&id).map(|s| *s == ProcessorState::Unhealthy).unwrap_or(false);
            let now_unhealthy =
                report.status == tierdb_core::health::HealthStatus::Unhealthy || report.exceeds_resource_threshold();

            if now_unhealthy && !was_unhealthy {
                self.states.insert(id.clone(), ProcessorState::Unhealthy);
                warn!(processor_id = %id, status = ?report.status, cpu_usage = report.cpu_usage, memory_usage = report.memory_usage, "processor marked unhealthy");
                self.events.publish(RegistryEvent::Unhealthy { processor_id: id });
            } else if !now_unhealthy && was_unhealthy {
                self.states.insert(id.clone(), ProcessorState::Healthy);
                info!(processor_id = %id, "processor recovered");
                self.events.publish(RegistryEvent::Recovered { processor_id: id });
            } else if !now_unhealthy {
                let degraded = report.status == tierdb_core::health::HealthStatus::Degraded;
                self.states.insert(
                    id,
                    if degraded {
                        ProcessorState::Degraded
                    } else {
                        ProcessorState::Healthy
                    },
                );
            }
        }
    }

    /// Compare each processor's access frequency against the hot/cold
    /// thresholds and migrate it across tiers if warranted and not within
    /// cooldown (`SPEC_FULL.md` §4.5 "Migration protocol").
    pub fn classifier_tick(&self, now: i64) {
        let ids: Vec<String> = self.processors.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let Some(processor) = self.get_processor(&id) else { continue };
            let Some(tier) = self.tiers.get(&id).map(|t| *t) else { continue };
            let metrics = processor.get_metrics();
            let config = self.config.read().clone();
            let eligible = match tier {
                Tier::Cold => metrics.throughput() >= config.hot_threshold,
                Tier::Hot => metrics.throughput() <= config.cold_threshold,
            };
            if !eligible {
                continue;
            }
            let state = self.states.get(&id).map(|s| *s).unwrap_or(ProcessorState::Healthy);
            if !state.can_start_migration() {
                continue;
            }
            let cooldown_elapsed = self
                .last_migration
                .get(&id)
                .map(|t| now - *t >= config.migration_cooldown.as_millis() as i64)
                .unwrap_or(true);
            if !cooldown_elapsed {
                debug!(processor_id = %id, "migration-eligible but still within cooldown, skipping");
                continue;
            }
            let _ = self.migrate(&id, now);
        }
    }

    /// Sweep every processor that reports a retention-sweep capability
    /// (cold-tier processors), deleting expired records.
    pub fn retention_sweep_tick(&self, now: i64) -> usize {
        let mut total = 0;
        for entry in self.processors.iter() {
            if let Some(sweeper) = entry.value().as_retention_sweeper() {
                total += sweeper.sweep_retention(now).unwrap_or(0);
            }
        }
        total
    }

    /// Flush every registered processor's buffered batch on the fixed
    /// 30-second cadence (`SPEC_FULL.md` §4.3), independent of whether it has
    /// reached its size threshold. A no-op for hot processors, which never
    /// buffer. Returns how many processors were flushed without error.
    pub fn flush_tick(&self) -> usize {
        let mut flushed = 0;
        for entry in self.processors.iter() {
            match entry.value().flush() {
                Ok(()) => flushed += 1,
                Err(e) => warn!(processor_id = %entry.key(), error = %e, "timed batch flush failed"),
            }
        }
        flushed
    }

    /// Migrate `source_id` to its tier's opposite: register a target
    /// processor, copy every record across, cut routing over, then
    /// unregister the source. Every transition is journaled before it takes
    /// effect on routing (`SPEC_FULL.md` §4.5).
    #[instrument(skip(self), fields(processor_id = %source_id, domain = %self.domain_of(source_id)))]
    pub fn migrate(&self, source_id: &str, now: i64) -> Result<String> {
        let source = self.get_processor(source_id).ok_or_else(|| Error::ProcessorNotFound(source_id.to_string()))?;
        let domain = *self.domains.get(source_id).ok_or_else(|| Error::ProcessorNotFound(source_id.to_string()))?;
        let source_tier = *self.tiers.get(source_id).ok_or_else(|| Error::ProcessorNotFound(source_id.to_string()))?;
        let target_tier = source_tier.opposite();
        let target_id = format!("{}-migrated-{}", source_id, Uuid::new_v4());

        let record_count = source.get_metadata().record_count;
        let mut plan = MigrationPlan::new(
            format!("migration-{}", Uuid::new_v4()),
            source_id,
            &target_id,
            source_tier,
            (record_count as i64).max(1) * 2,
            now,
        );
        self.journal.record(plan.clone());
        self.states.insert(source_id.to_string(), ProcessorState::Migrating);

        let result = (|| -> Result<()> {
            let target_config = source.get_configuration();
            self.create_and_register(target_id.clone(), domain, target_tier, target_config)?;
            let target = self.get_processor(&target_id).expect("just registered");

            for record in source.query(&[])? {
                target.store(record)?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.routing.remove(domain, source_tier, source_id);
                self.routing.insert(domain, target_tier, &target_id);
                // Keyed by both ids: the source row is about to be dropped by
                // `unregister_processor`, but the cooldown still has to bind
                // the *new* processor too, or a freshly cut-over target with
                // near-zero uptime (and so near-zero throughput) would look
                // immediately eligible to migrate straight back.
                self.last_migration.insert(source_id.to_string(), now);
                self.last_migration.insert(target_id.clone(), now);

                let _ = self.unregister_processor(source_id);
                self.states.insert(target_id.clone(), ProcessorState::Healthy);

                plan.complete(now);
                self.journal.record(plan);
                info!(source_id = %source_id, target_id = %target_id, "migration completed");
                self.events.publish(RegistryEvent::Migrated {
                    source_id: source_id.to_string(),
                    target_id: target_id.clone(),
                });
                Ok(target_id)
            }
            Err(e) => {
                let _ = self.unregister_processor(&target_id);
                self.states.insert(source_id.to_string(), ProcessorState::Healthy);
                plan.fail(now, e.to_string());
                self.journal.record(plan);
                error!(source_id = %source_id, target_id = %target_id, reason = %e, "migration failed");
                self.events.publish(RegistryEvent::MigrationFailed {
                    source_id: source_id.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    // ---- background loop lifecycle ---------------------------------------

    /// Start the health/classifier/retention loops on dedicated heartbeat
    /// threads, each of which submits its work to the shared
    /// [`BackgroundScheduler`] at the registry's configured interval.
    pub fn start_background_loops(self: &Arc<Self>) {
        let interval = self.config.read().health_check_interval;
        self.spawn_loop(interval, TaskPriority::Normal, |r| r.health_monitor_tick());
        self.spawn_loop(interval, TaskPriority::Low, |r| {
            r.classifier_tick(now_millis());
        });
        self.spawn_loop(interval, TaskPriority::Low, |r| {
            r.retention_sweep_tick(now_millis());
        });
        self.spawn_loop(BATCH_FLUSH_INTERVAL, TaskPriority::Low, |r| {
            r.flush_tick();
        });
    }

    fn spawn_loop(self: &Arc<Self>, interval: Duration, priority: TaskPriority, tick: fn(&Arc<Registry>)) {
        let registry = Arc::clone(self);
        let stop = Arc::clone(&self.loop_stop);
        let scheduler = Arc::clone(&self.scheduler);
        let handle = thread::Builder::new()
            .name("tierdb-registry-heartbeat".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    let registry = Arc::clone(&registry);
                    let _ = scheduler.submit(priority, move || tick(&registry));
                }
            })
            .expect("failed to spawn registry heartbeat thread");
        self.loop_handles.lock().push(handle);
    }

    /// Block until every queued and in-flight scheduler task completes.
    pub fn drain(&self) {
        self.scheduler.drain();
    }

    /// Stop the heartbeat loops, shut down every processor, and shut down
    /// the background scheduler.
    pub fn shutdown(&self) -> Result<()> {
        self.loop_stop.store(true, Ordering::Release);
        for handle in self.loop_handles.lock().drain(..) {
            let _ = handle.join();
        }
        for entry in self.processors.iter() {
            entry.value().shutdown()?;
        }
        self.scheduler.shutdown();
        Ok(())
    }

    /// Aggregate metrics across every registered processor.
    pub fn get_system_metrics(&self) -> SystemMetrics {
        let mut metrics = SystemMetrics::default();
        for entry in self.processors.iter() {
            let id = entry.key();
            let meta = entry.value().get_metadata();
            metrics.processor_count += 1;
            match self.tiers.get(id).map(|t| *t) {
                Some(Tier::Hot) => metrics.hot_processor_count += 1,
                Some(Tier::Cold) => metrics.cold_processor_count += 1,
                None => {}
            }
            metrics.total_records += meta.record_count;
            metrics.total_size_bytes += meta.total_size;
            if matches!(
                self.states.get(id).map(|s| *s),
                Some(ProcessorState::Unhealthy) | Some(ProcessorState::Offline)
            ) {
                metrics.unhealthy_processor_count += 1;
            }
        }
        metrics
    }
}

//! # tierdb
//!
//! A sharded, in-process data layer that routes records across hot
//! (uncompressed, latency-optimized) and cold (compressed,
//! retention-swept) processor tiers, by domain.
//!
//! tierdb owns no network surface: it's a library embedded in a host
//! process, the way the host's own cache or connection pool would be.
//! Callers build a [`Registry`], register a factory per `(domain, tier)`
//! pair, then store, retrieve, and query through the registry — which
//! load-balances across replicas, migrates processors between tiers as
//! their access patterns shift, and sweeps expired cold-tier records.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tierdb::{Domain, DomainTierFactory, Query, Record, Registry, RegistryConfig, Tier};
//! use serde_json::json;
//!
//! fn main() -> tierdb::Result<()> {
//!     let registry = Arc::new(Registry::new(RegistryConfig::default()));
//!     registry.register_factory(Domain::User, Tier::Hot, Arc::new(DomainTierFactory::new(Domain::User, Tier::Hot, None)));
//!     registry.register_factory(Domain::User, Tier::Cold, Arc::new(DomainTierFactory::new(Domain::User, Tier::Cold, None)));
//!
//!     registry.create_and_register("users-0", Domain::User, Tier::Hot, Default::default())?;
//!
//!     let id = registry.store(Domain::User, Record::new("u1", Domain::User, 0, json!({"email": "a@example.com"})))?;
//!     assert!(registry.retrieve(&id, "u1")?.is_some());
//!
//!     let result = registry.query(Query::for_domain(Domain::User));
//!     assert_eq!(result.total_records(), 1);
//!
//!     registry.shutdown()?;
//!     Ok(())
//! }
//! ```
//!
//! # Domains and tiers
//!
//! | Domain | Indexed fields | Tiers |
//! |--------|-----------------|-------|
//! | [`Domain::User`] | `email` (unique), `token`, `permission` | hot, cold |
//! | [`Domain::Chat`] | `conversation_id`, `sender_id`, `minute`, `hour`, `day` | hot, cold |
//! | [`Domain::Stats`] | `metric`, `category`, `source`, `minute`, `hour`, `day`, `dimension`, `value`, `tag` | hot, cold |
//! | [`Domain::Logs`] | `level`, `application`, `service`, `host`, `minute`, `hour`, `day`, `traceId`, `requestId`, `tag`, `errorType` | cold only |
//! | [`Domain::Generic`] | none | hot, cold |
//!
//! Call [`Registry::start_background_loops`] to run the health monitor,
//! hot/cold classifier, and retention sweeper on their own heartbeat
//! threads; call [`Registry::shutdown`] to stop them and every registered
//! processor together.
//!
//! # Architecture
//!
//! The [`Registry`] is the entry point. Internally it composes:
//! `tierdb-core` (shared types and the `Processor` contract), `tierdb-storage`
//! (indices, retention queue, compressors), `tierdb-concurrency` (per-processor
//! locking), `tierdb-durability` (persistence hook and migration journal), and
//! `tierdb-engine` (hot/cold processors, domain dispatch, the background task
//! scheduler). Only the surface re-exported here is stable; the member crates
//! are implementation detail.

pub use tierdb_core::{
    now_millis, AccessPattern, AccessType, AggregatedQueryResult, ArchivalInfo, AutoScalingConfig,
    Capabilities, Compressor, ConsistencyLevel, Domain, Error, ErrorCode, EventBus, Filter,
    HealthReport, HealthStatus, LoadBalancingStrategy, MigrationPlan, MigrationStatus,
    PerformanceTier, PersistenceHook, Processor, ProcessorConfig, ProcessorEvent,
    ProcessorFactory, ProcessorId, ProcessorMetadata, ProcessorMetrics, ProcessorState, Query,
    QueryOptions, QueryResult, QueryResultMetadata, Record, RecordId, RecordMeta,
    RegistryConfig, RegistryEvent, Result, RetentionCategory, RetentionConfig, RetentionSweeper,
    SystemMetrics, Tier,
};

pub use tierdb_concurrency::{AccessCoordinator, LockTable};
pub use tierdb_durability::{InMemoryPersistenceHook, MigrationJournal};
pub use tierdb_engine::{
    BackgroundScheduler, BackpressureError, ColdProcessor, DomainTierFactory, HotProcessor,
    SchedulerStats, TaskPriority,
};
pub use tierdb_storage::{ArchiveIndex, NoopCompressor, ZstdCompressor};

pub use tierdb_registry::Registry;

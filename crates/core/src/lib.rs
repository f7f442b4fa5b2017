//! Shared types for tierdb: records, ids, domains, tiers, configuration,
//! errors, events, and the processor/persistence/compressor contracts.
//!
//! Every other crate in the workspace (`tierdb-storage`, `tierdb-concurrency`,
//! `tierdb-durability`, `tierdb-engine`, `tierdb-registry`) depends on this
//! one; it has no dependency on any of them.

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod health;
pub mod ids;
pub mod metrics;
pub mod migration;
pub mod processor_meta;
pub mod query;
pub mod record;
pub mod tier;
pub mod traits;

pub use config::{
    AutoScalingConfig, ConsistencyLevel, LoadBalancingStrategy, ProcessorConfig, RegistryConfig,
    RetentionConfig,
};
pub use domain::Domain;
pub use error::{Error, ErrorCode, Result};
pub use events::{EventBus, ProcessorEvent, RegistryEvent};
pub use health::{HealthReport, HealthStatus};
pub use ids::{ProcessorId, RecordId};
pub use metrics::{ProcessorMetrics, SystemMetrics};
pub use migration::{MigrationPlan, MigrationStatus, ProcessorState};
pub use processor_meta::{Capabilities, ProcessorMetadata};
pub use query::{AggregatedQueryResult, Filter, Query, QueryOptions, QueryResult, QueryResultMetadata};
pub use record::{AccessPattern, AccessType, ArchivalInfo, Record, RecordMeta, RetentionCategory};
pub use tier::{PerformanceTier, Tier};
pub use traits::{Compressor, PersistenceHook, Processor, ProcessorFactory, RetentionSweeper};

/// Current unix-millis timestamp.
///
/// Centralized here so the rest of the workspace never calls
/// `SystemTime::now()` directly, keeping a single seam for tests that need a
/// controllable clock.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

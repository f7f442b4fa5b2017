//! Processor metadata, as returned by `getMetadata` and surfaced in the
//! registry's processor listings (`SPEC_FULL.md` §3).

use crate::config::ProcessorConfig;
use crate::domain::Domain;
use crate::health::HealthStatus;
use crate::metrics::ProcessorMetrics;
use crate::migration::MigrationPlan;
use crate::tier::{PerformanceTier, Tier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything the registry and callers need to know about a processor
/// without talking to it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorMetadata {
    /// Unique processor id.
    pub id: String,
    /// Domain this processor serves.
    pub domain: Domain,
    /// Current storage tier.
    pub tier: Tier,
    /// SLA classification.
    pub performance_tier: PerformanceTier,
    /// Current health classification.
    pub health_status: HealthStatus,
    /// Total accesses observed (mirrors `metrics.access_frequency`).
    pub access_frequency: u64,
    /// Unix millis of the most recent access across all records.
    pub last_accessed: i64,
    /// Current `|records|`.
    pub record_count: u64,
    /// Sum of per-record sizes, in bytes.
    pub total_size: u64,
    /// Opaque endpoint descriptor (in-process deployments use the
    /// processor id itself; kept for parity with out-of-process fronting).
    pub endpoint: String,
    /// Unix millis the processor was registered.
    pub created_at: i64,
    /// Unix millis of the most recent metadata-affecting change.
    pub updated_at: i64,
    /// Effective configuration.
    pub configuration: ProcessorConfig,
    /// Current operational metrics.
    pub metrics: ProcessorMetrics,
    /// Every migration plan this processor id has been the subject of.
    pub migration_history: Vec<MigrationPlan>,
    /// Ids of processors this one has relationships with (e.g. a migration
    /// source/target pair, or a cross-domain link).
    pub related_processor_ids: BTreeSet<String>,
    /// Free-form operator tags.
    pub tags: BTreeSet<String>,
}

/// What a processor implementation supports, used by the registry to decide
/// whether a capability (e.g. replicated reads, full-text indexing) is
/// available without a failed call round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether this processor batches writes (always true for cold tier).
    pub supports_batching: bool,
    /// Whether this processor compresses stored records.
    pub supports_compression: bool,
    /// Whether this processor maintains a full-text index.
    pub supports_full_text_search: bool,
    /// Whether this processor maintains a retention queue.
    pub supports_retention_sweep: bool,
    /// Names of the secondary indices this processor maintains.
    pub indexed_fields: Vec<String>,
}

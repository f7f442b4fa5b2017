//! The processor contract, the persistence hook contract, and the pluggable
//! compressor contract (`SPEC_FULL.md` §4.1, §6, §9).
//!
//! Domain and tier specialization is expressed as composition, not
//! inheritance: every processor implements the same [`Processor`] trait;
//! what differs between a hot user processor and a cold logs processor is
//! which concrete type backs the trait object, not a deeper class hierarchy.

use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::health::HealthReport;
use crate::metrics::ProcessorMetrics;
use crate::processor_meta::{Capabilities, ProcessorMetadata};
use crate::query::Filter;
use crate::record::Record;
use std::sync::Arc;

/// The common contract every processor implements, regardless of domain or
/// tier (`SPEC_FULL.md` §4.1, §6).
///
/// Implementors serialize mutations to their own store/indices behind an
/// internal lock (`SPEC_FULL.md` §5), so every method here takes `&self`.
pub trait Processor: Send + Sync {
    /// Insert or overwrite a record by id. Runs eviction first if at
    /// capacity; emits `record_stored`.
    fn store(&self, record: Record) -> Result<()>;

    /// Look up a record by id, updating its access pattern. Emits
    /// `record_retrieved`.
    fn retrieve(&self, id: &str) -> Result<Option<Record>>;

    /// Evaluate `filters` against the store, index-accelerated where
    /// possible. Emits `query_executed` with the result count and updates
    /// the access pattern of every returned record.
    fn query(&self, filters: &[Filter]) -> Result<Vec<Record>>;

    /// Remove a record from every index, then from the store. Emits
    /// `record_deleted`. Returns `true` if a record was actually removed.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Equivalent to `store` (the caller is responsible for bumping
    /// `metadata.version`); see `SPEC_FULL.md` §9 open question (b).
    fn update(&self, record: Record) -> Result<()> {
        self.store(record)
    }

    /// Current health snapshot.
    fn get_health(&self) -> HealthReport;

    /// Current operational metrics.
    fn get_metrics(&self) -> ProcessorMetrics;

    /// Current metadata (id, domain, tier, configuration, metrics, ...).
    fn get_metadata(&self) -> ProcessorMetadata;

    /// What this processor supports.
    fn get_capabilities(&self) -> Capabilities;

    /// Effective configuration.
    fn get_configuration(&self) -> ProcessorConfig;

    /// Flush any buffered work, drop records and indices, emit `shutdown`.
    fn shutdown(&self) -> Result<()>;

    /// Drain and commit any buffered batch now, independent of size or the
    /// registry's 30-second flush timer (`SPEC_FULL.md` §4.3). A no-op for
    /// processors that don't buffer writes (every hot processor); cold
    /// processors and domain wrappers around them override this.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// This processor's retention-sweep capability, if it has one.
    ///
    /// `Processor` stays object-safe and domain/tier-agnostic; the registry's
    /// retention sweeper (`SPEC_FULL.md` §4.5) probes this instead of
    /// downcasting to a concrete type. Hot processors keep the default
    /// `None`; cold processors (and domain wrappers around them) return
    /// `Some(self)`.
    fn as_retention_sweeper(&self) -> Option<&dyn RetentionSweeper> {
        None
    }
}

/// Expiring-record sweep, implemented by processors that maintain a
/// retention queue (see [`Capabilities::supports_retention_sweep`]).
pub trait RetentionSweeper: Send + Sync {
    /// Remove every record expired as of `now` (unix millis). Returns how
    /// many were deleted.
    fn sweep_retention(&self, now: i64) -> Result<usize>;
}

/// Constructs a processor for a given `(domain, tier)` pair.
///
/// The registry holds one factory per `(domain, tier)` combination
/// (`registerFactory`); [`crate::domain::Domain::Generic`] paired with
/// either tier is always available as a fallback.
pub trait ProcessorFactory: Send + Sync {
    /// Build and initialize a processor ready to serve traffic.
    fn create(&self, id: &str, config: ProcessorConfig) -> Result<Arc<dyn Processor>>;
}

/// Pluggable persistence contract (`SPEC_FULL.md` §6).
///
/// The core ships only an in-memory default
/// (`tierdb_durability::InMemoryPersistenceHook`); a real deployment plugs
/// in whatever on-disk or remote format it needs.
pub trait PersistenceHook: Send + Sync {
    /// Persist one record.
    fn save_record(&self, processor_id: &str, record: &Record) -> Result<()>;
    /// Load one record by id, if present.
    fn load_record(&self, processor_id: &str, id: &str) -> Result<Option<Record>>;
    /// List every record id known to the hook for a processor.
    fn list_ids(&self, processor_id: &str) -> Result<Vec<String>>;
    /// Persist a named index's serialized snapshot.
    fn save_index(&self, processor_id: &str, index_name: &str, data: &[u8]) -> Result<()>;
    /// Load a named index's serialized snapshot, if present.
    fn load_index(&self, processor_id: &str, index_name: &str) -> Result<Option<Vec<u8>>>;
    /// Persist a cold-tier compressed batch.
    fn save_batch(&self, processor_id: &str, batch_id: &str, data: &[u8]) -> Result<()>;
    /// Load a cold-tier compressed batch, if present.
    fn load_batch(&self, processor_id: &str, batch_id: &str) -> Result<Option<Vec<u8>>>;
}

/// Pluggable compression contract (`SPEC_FULL.md` §4.3).
///
/// The spec mandates a reported compression ratio, not a specific codec;
/// ratio bookkeeping lives with the caller (it needs to sum across many
/// records), this trait only needs to round-trip bytes at a given level.
pub trait Compressor: Send + Sync {
    /// Compress `data` at `level` (`1..=5`).
    fn compress(&self, level: u8, data: &[u8]) -> Result<Vec<u8>>;
    /// Reverse [`Compressor::compress`].
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

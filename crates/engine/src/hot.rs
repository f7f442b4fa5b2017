//! Hot-tier processor: uncompressed, latency-optimized
//! (`SPEC_FULL.md` §4.2).

use crate::processor_base::ProcessorBase;
use std::sync::Arc;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::domain::Domain;
use tierdb_core::error::Result;
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::processor_meta::{Capabilities, ProcessorMetadata};
use tierdb_core::query::Filter;
use tierdb_core::record::Record;
use tierdb_core::tier::{PerformanceTier, Tier};
use tierdb_core::traits::{PersistenceHook, Processor};

/// A hot processor: every write is immediately visible in memory, no
/// compression, no batching.
pub struct HotProcessor {
    base: ProcessorBase,
    indexed_fields: Vec<String>,
}

impl HotProcessor {
    /// Build a hot processor for `domain` with the given fixed indices.
    pub fn new(
        id: impl Into<String>,
        domain: Domain,
        config: ProcessorConfig,
        indexed_fields: Vec<String>,
        persistence: Option<Arc<dyn PersistenceHook>>,
    ) -> Self {
        HotProcessor {
            base: ProcessorBase::new(
                id,
                domain,
                Tier::Hot,
                PerformanceTier::Realtime,
                config,
                indexed_fields.clone(),
                persistence,
            ),
            indexed_fields,
        }
    }

    /// Access the underlying shared base, for registry-internal migration
    /// copy steps.
    pub fn base(&self) -> &ProcessorBase {
        &self.base
    }
}

impl Processor for HotProcessor {
    fn store(&self, record: Record) -> Result<()> {
        self.base.store(record)
    }

    fn retrieve(&self, id: &str) -> Result<Option<Record>> {
        self.base.retrieve(id)
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<Record>> {
        self.base.query(filters)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.base.delete(id)
    }

    fn get_health(&self) -> HealthReport {
        self.base.health()
    }

    fn get_metrics(&self) -> ProcessorMetrics {
        self.base.metrics()
    }

    fn get_metadata(&self) -> ProcessorMetadata {
        self.base.metadata()
    }

    fn get_capabilities(&self) -> Capabilities {
        Capabilities {
            supports_batching: false,
            supports_compression: false,
            supports_full_text_search: false,
            supports_retention_sweep: false,
            indexed_fields: self.indexed_fields.clone(),
        }
    }

    fn get_configuration(&self) -> ProcessorConfig {
        self.base.configuration()
    }

    fn shutdown(&self) -> Result<()> {
        self.base.shutdown()
    }
}

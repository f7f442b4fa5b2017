//! Cold-tier processor: batched, compressed, retention-swept
//! (`SPEC_FULL.md` §4.3).

use crate::processor_base::ProcessorBase;
use parking_lot::Mutex;
use std::sync::Arc;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::domain::Domain;
use tierdb_core::error::Result;
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::processor_meta::{Capabilities, ProcessorMetadata};
use tierdb_core::query::Filter;
use tierdb_core::record::{ArchivalInfo, Record};
use tierdb_core::tier::{PerformanceTier, Tier};
use tierdb_core::events::ProcessorEvent;
use tierdb_core::traits::{Compressor, PersistenceHook, Processor, RetentionSweeper};
use tierdb_storage::{compression_ratio, ArchiveIndex, BatchBuffer, RetentionQueue};
use uuid::Uuid;

/// A cold processor: writes land in memory immediately (so reads stay
/// correct) but are also buffered for batched compression into archive
/// storage, and scheduled for expiry via the retention queue.
pub struct ColdProcessor {
    base: ProcessorBase,
    indexed_fields: Vec<String>,
    batch: Mutex<BatchBuffer>,
    archive: ArchiveIndex,
    retention: Mutex<RetentionQueue>,
    compressor: Arc<dyn Compressor>,
    persistence: Option<Arc<dyn PersistenceHook>>,
    compression_level: u8,
}

impl ColdProcessor {
    /// Build a cold processor for `domain` with the given fixed indices and
    /// compressor.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        domain: Domain,
        config: ProcessorConfig,
        indexed_fields: Vec<String>,
        batch_size: usize,
        compressor: Arc<dyn Compressor>,
        persistence: Option<Arc<dyn PersistenceHook>>,
    ) -> Self {
        let id = id.into();
        ColdProcessor {
            base: ProcessorBase::new(
                id.clone(),
                domain,
                Tier::Cold,
                PerformanceTier::Standard,
                config,
                indexed_fields.clone(),
                persistence.clone(),
            ),
            indexed_fields,
            batch: Mutex::new(BatchBuffer::new(batch_size)),
            archive: ArchiveIndex::new(),
            retention: Mutex::new(RetentionQueue::new()),
            compressor,
            persistence,
            compression_level: 3,
        }
    }

    /// Access the underlying shared base.
    pub fn base(&self) -> &ProcessorBase {
        &self.base
    }

    /// Schedule `record_id`'s retention expiry and buffer it for the next
    /// compressed batch; flushes the batch if it is now full.
    ///
    /// `retention_days_override` lets a domain specialization (the logs
    /// domain's per-level day table, see `crate::domain::logs`) bypass
    /// `record.metadata.retention`'s coarser category when it disagrees.
    fn on_write(&self, record: &Record, retention_days_override: Option<Option<u32>>) -> Result<()> {
        let days = retention_days_override.unwrap_or_else(|| record.metadata.retention.default_days());
        if let Some(days) = days {
            let expires_at = record.timestamp + days as i64 * 86_400_000;
            self.retention.lock().insert(expires_at, record.id.clone());
        }

        let full = self.batch.lock().push(record.clone());
        if full {
            self.flush_batch()?;
        }
        Ok(())
    }

    /// Store a record whose retention is governed by an explicit day count
    /// rather than its `RetentionCategory`, e.g. the logs domain's
    /// per-level table. `None` means never expires.
    pub fn store_with_retention_days(&self, record: Record, days: Option<u32>) -> Result<()> {
        self.base.store(record.clone())?;
        self.on_write(&record, Some(days))
    }

    /// Compress every buffered record into one batch, persist it, and
    /// record each record's archive location.
    fn flush_batch(&self) -> Result<()> {
        let pending = self.batch.lock().drain();
        if pending.is_empty() {
            return Ok(());
        }
        let payload = serde_json::to_vec(&pending)
            .map_err(|e| tierdb_core::error::Error::Validation(format!("batch serialize failed: {e}")))?;
        let compressed = self.compressor.compress(self.compression_level, &payload)?;
        let batch_id = format!("batch-{}", Uuid::new_v4());

        if let Some(hook) = &self.persistence {
            hook.save_batch(self.base.id(), &batch_id, &compressed)?;
        }

        let ratio = compression_ratio(payload.len(), compressed.len());
        let per_record_size = (compressed.len() as f64 * ratio).max(1.0) as u64 / pending.len().max(1) as u64;
        for record in &pending {
            self.archive.insert(
                &record.id,
                ArchivalInfo {
                    location: batch_id.clone(),
                    size: per_record_size,
                },
            );
        }
        self.base.publish_event(ProcessorEvent::BatchProcessed {
            processor_id: self.base.id().to_string(),
            record_count: pending.len(),
        });
        Ok(())
    }

    /// Remove every record expired as of `now`, returning how many were
    /// deleted. Driven by the registry's retention-sweeper background task.
    pub fn sweep_retention(&self, now: i64) -> Result<usize> {
        let expired = self.retention.lock().find_expired(now);
        let mut deleted = 0;
        for id in expired {
            if self.base.delete(&id)? {
                self.archive.remove(&id);
                deleted += 1;
            }
        }
        if deleted > 0 {
            self.retention.lock().remove_expired(now);
            self.base.publish_event(ProcessorEvent::RetentionCleanup {
                processor_id: self.base.id().to_string(),
                deleted_count: deleted,
            });
        }
        Ok(deleted)
    }

    /// Whether `record_id` has been committed to a compressed archive batch.
    pub fn is_archived(&self, record_id: &str) -> bool {
        self.archive.get(record_id).is_some()
    }

    /// Drain and commit the current batch now, regardless of its size.
    /// A no-op if the buffer is empty (`SPEC_FULL.md` §4.3, §8 scenario 5:
    /// "a subsequent `flush()` with an empty buffer is a no-op"). Callers
    /// invoke this directly; the registry's 30-second flush loop also calls
    /// it on every registered processor through the `Processor` trait.
    pub fn flush(&self) -> Result<()> {
        self.flush_batch()
    }
}

impl Processor for ColdProcessor {
    fn store(&self, record: Record) -> Result<()> {
        self.base.store(record.clone())?;
        self.on_write(&record, None)
    }

    fn retrieve(&self, id: &str) -> Result<Option<Record>> {
        self.base.retrieve(id)
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<Record>> {
        self.base.query(filters)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.base.delete(id)?;
        if removed {
            self.archive.remove(id);
        }
        Ok(removed)
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
            supports_batching: true,
            supports_compression: true,
            supports_full_text_search: false,
            supports_retention_sweep: true,
            indexed_fields: self.indexed_fields.clone(),
        }
    }

    fn get_configuration(&self) -> ProcessorConfig {
        self.base.configuration()
    }

    fn shutdown(&self) -> Result<()> {
        self.flush_batch()?;
        self.base.shutdown()
    }

    fn as_retention_sweeper(&self) -> Option<&dyn RetentionSweeper> {
        Some(self)
    }

    fn flush(&self) -> Result<()> {
        self.flush()
    }
}

impl RetentionSweeper for ColdProcessor {
    fn sweep_retention(&self, now: i64) -> Result<usize> {
        self.sweep_retention(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tierdb_storage::NoopCompressor;

    fn processor() -> ColdProcessor {
        ColdProcessor::new(
            "c1",
            Domain::Logs,
            ProcessorConfig::default(),
            vec![],
            2,
            Arc::new(NoopCompressor),
            None,
        )
    }

    #[test]
    fn store_below_batch_size_does_not_archive_yet() {
        let p = processor();
        p.store(Record::new("r1", Domain::Logs, 0, json!({}))).unwrap();
        assert!(!p.is_archived("r1"));
    }

    #[test]
    fn store_reaching_batch_size_flushes_and_archives() {
        let p = processor();
        p.store(Record::new("r1", Domain::Logs, 0, json!({}))).unwrap();
        p.store(Record::new("r2", Domain::Logs, 0, json!({}))).unwrap();
        assert!(p.is_archived("r1"));
        assert!(p.is_archived("r2"));
    }

    #[test]
    fn flushing_a_full_batch_publishes_one_batch_processed_event() {
        let p = ColdProcessor::new(
            "c1",
            Domain::Logs,
            ProcessorConfig::default(),
            vec![],
            3,
            Arc::new(NoopCompressor),
            None,
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        p.base().on_event(move |e| {
            if let tierdb_core::events::ProcessorEvent::BatchProcessed { record_count, .. } = e {
                seen2.lock().push(*record_count);
            }
        });
        p.store(Record::new("r1", Domain::Logs, 0, json!({}))).unwrap();
        p.store(Record::new("r2", Domain::Logs, 0, json!({}))).unwrap();
        p.store(Record::new("r3", Domain::Logs, 0, json!({}))).unwrap();
        assert_eq!(*seen.lock(), vec![3]);

        // An empty buffer flush is a no-op: shutdown must not publish again.
        p.shutdown().unwrap();
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn sweep_retention_deletes_expired_records() {
        let p = processor();
        let mut record = Record::new("r1", Domain::Logs, 0, json!({}));
        record.metadata.retention = tierdb_core::record::RetentionCategory::Debug;
        p.store(record).unwrap();

        let one_day_ms = 86_400_000;
        let deleted = p.sweep_retention(one_day_ms + 1).unwrap();
        assert_eq!(deleted, 1);
        assert!(p.retrieve("r1").unwrap().is_none());
    }

    #[test]
    fn retention_sweeper_is_reachable_through_the_processor_trait() {
        let p: Arc<dyn Processor> = Arc::new(processor());
        assert!(p.as_retention_sweeper().is_some());
    }

    #[test]
    fn flush_commits_a_partial_batch_below_the_size_threshold() {
        let p = processor();
        p.store(Record::new("r1", Domain::Logs, 0, json!({}))).unwrap();
        assert!(!p.is_archived("r1"));
        p.flush().unwrap();
        assert!(p.is_archived("r1"));
    }

    #[test]
    fn flush_on_an_empty_buffer_is_a_no_op() {
        let p = processor();
        let seen = Arc::new(Mutex::new(0));
        let seen2 = seen.clone();
        p.base().on_event(move |e| {
            if let tierdb_core::events::ProcessorEvent::BatchProcessed { .. } = e {
                *seen2.lock() += 1;
            }
        });
        p.flush().unwrap();
        p.flush().unwrap();
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn permanent_retention_is_never_swept() {
        let p = processor();
        let mut record = Record::new("r1", Domain::Logs, 0, json!({}));
        record.metadata.retention = tierdb_core::record::RetentionCategory::Permanent;
        p.store(record).unwrap();

        let far_future = 10 * 365 * 86_400_000_i64;
        let deleted = p.sweep_retention(far_future).unwrap();
        assert_eq!(deleted, 0);
        assert!(p.retrieve("r1").unwrap().is_some());
    }
}

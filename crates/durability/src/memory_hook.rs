//! In-memory default [`PersistenceHook`] implementation.
//!
//! Every processor works without a persistence hook configured (pure
//! in-memory deployment); this implementation exists so the hook contract
//! itself, and anything built against it, can be exercised without bringing
//! in an external store. A real deployment supplies its own hook.

use dashmap::DashMap;
use tierdb_core::error::Result;
use tierdb_core::record::Record;
use tierdb_core::traits::PersistenceHook;
use tracing::debug;

#[derive(Default)]
struct ProcessorStore {
    records: DashMap<String, Record>,
    indices: DashMap<String, Vec<u8>>,
    batches: DashMap<String, Vec<u8>>,
}

/// A [`PersistenceHook`] backed entirely by in-process maps.
#[derive(Default)]
pub struct InMemoryPersistenceHook {
    processors: DashMap<String, ProcessorStore>,
}

impl InMemoryPersistenceHook {
    /// Create an empty hook.
    pub fn new() -> Self {
        InMemoryPersistenceHook::default()
    }

    fn store_for<'a>(&'a self, processor_id: &str) -> dashmap::mapref::one::Ref<'a, String, ProcessorStore> {
        self.processors
            .entry(processor_id.to_string())
            .or_default();
        self.processors.get(processor_id).expect("just inserted")
    }
}

impl PersistenceHook for InMemoryPersistenceHook {
    fn save_record(&self, processor_id: &str, record: &Record) -> Result<()> {
        debug!(processor_id, record_id = %record.id, "persisting record");
        self.store_for(processor_id)
            .records
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load_record(&self, processor_id: &str, id: &str) -> Result<Option<Record>> {
        Ok(self
            .processors
            .get(processor_id)
            .and_then(|s| s.records.get(id).map(|r| r.clone())))
    }

    fn list_ids(&self, processor_id: &str) -> Result<Vec<String>> {
        Ok(self
            .processors
            .get(processor_id)
            .map(|s| s.records.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default())
    }

    fn save_index(&self, processor_id: &str, index_name: &str, data: &[u8]) -> Result<()> {
        self.store_for(processor_id)
            .indices
            .insert(index_name.to_string(), data.to_vec());
        Ok(())
    }

    fn load_index(&self, processor_id: &str, index_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .processors
            .get(processor_id)
            .and_then(|s| s.indices.get(index_name).map(|d| d.clone())))
    }

    fn save_batch(&self, processor_id: &str, batch_id: &str, data: &[u8]) -> Result<()> {
        debug!(processor_id, batch_id, size = data.len(), "persisting batch");
        self.store_for(processor_id)
            .batches
            .insert(batch_id.to_string(), data.to_vec());
        Ok(())
    }

    fn load_batch(&self, processor_id: &str, batch_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .processors
            .get(processor_id)
            .and_then(|s| s.batches.get(batch_id).map(|d| d.clone())))
    }
}

//! Per-processor locking.
//!
//! Grounded on the teacher's `TransactionManager::commit_locks`
//! (`concurrency/src/manager.rs`): a `DashMap` keyed by id, one lock per key,
//! so unrelated processors never contend. The teacher uses a plain `Mutex`
//! per branch because every commit there is exclusive; a processor instead
//! needs concurrent readers, so this is a `RwLock`: shared for
//! `retrieve`/`query`, exclusive for `store`/`delete`/`update` and for index
//! rebuilds (`SPEC_FULL.md` §5).

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// One lock per processor id, created lazily on first access.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl LockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        LockTable::default()
    }

    /// Get (creating if needed) the lock for `processor_id`.
    pub fn get(&self, processor_id: &str) -> Arc<RwLock<()>> {
        self.locks
            .entry(processor_id.to_string())
            .or_insert_with(|| {
                debug!(processor_id, "creating lock for new processor");
                Arc::new(RwLock::new(()))
            })
            .clone()
    }

    /// Drop the lock entry for `processor_id`, e.g. once it's unregistered.
    /// In-flight guards obtained before this call remain valid; this just
    /// stops the table from holding a reference forever.
    pub fn remove(&self, processor_id: &str) {
        self.locks.remove(processor_id);
    }

    /// Number of processors currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

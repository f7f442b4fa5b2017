//! Retention queue: `expiration timestamp -> set<record id>`.
//!
//! Grounded on the teacher's `TTLIndex` (`ttl.rs`): a `BTreeMap` keyed by
//! expiration timestamp lets the retention sweeper find everything expired
//! before `now` in `O(expired count)`, never `O(|records|)`.

use std::collections::{BTreeMap, HashSet};

/// Maps expiration timestamps (unix millis) to the record ids expiring then.
#[derive(Debug, Default)]
pub struct RetentionQueue {
    index: BTreeMap<i64, HashSet<String>>,
}

impl RetentionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        RetentionQueue::default()
    }

    /// Schedule `record_id` to expire at `expires_at` (unix millis).
    pub fn insert(&mut self, expires_at: i64, record_id: impl Into<String>) {
        self.index.entry(expires_at).or_default().insert(record_id.into());
    }

    /// Cancel a scheduled expiration, e.g. on delete or retention-category change.
    pub fn remove(&mut self, expires_at: i64, record_id: &str) {
        if let Some(ids) = self.index.get_mut(&expires_at) {
            ids.remove(record_id);
            if ids.is_empty() {
                self.index.remove(&expires_at);
            }
        }
    }

    /// Every record id expired at or before `now`.
    pub fn find_expired(&self, now: i64) -> Vec<String> {
        self.index
            .range(..=now)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Drop every entry expired at or before `now`. Returns the count removed.
    pub fn remove_expired(&mut self, now: i64) -> usize {
        let expired_timestamps: Vec<i64> = self.index.range(..=now).map(|(ts, _)| *ts).collect();
        let mut count = 0;
        for ts in expired_timestamps {
            if let Some(ids) = self.index.remove(&ts) {
                count += ids.len();
            }
        }
        count
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of scheduled record ids.
    pub fn len(&self) -> usize {
        self.index.values().map(|ids| ids.len()).sum()
    }
}

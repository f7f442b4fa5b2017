//! Archive index: `record id -> {location, compressed size}` for records a
//! cold processor has pushed into a persisted, compressed batch
//! (`SPEC_FULL.md` §4.3).

use dashmap::DashMap;
use tierdb_core::record::ArchivalInfo;

/// Tracks where every archived record's bytes currently live.
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    entries: DashMap<String, ArchivalInfo>,
}

impl ArchiveIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        ArchiveIndex::default()
    }

    /// Record that `record_id` now lives at `info`.
    pub fn insert(&self, record_id: impl Into<String>, info: ArchivalInfo) {
        self.entries.insert(record_id.into(), info);
    }

    /// Look up where `record_id`'s bytes live, if archived.
    pub fn get(&self, record_id: &str) -> Option<ArchivalInfo> {
        self.entries.get(record_id).map(|e| e.clone())
    }

    /// Drop the archive entry for `record_id`, e.g. on delete.
    pub fn remove(&self, record_id: &str) -> Option<ArchivalInfo> {
        self.entries.remove(record_id).map(|(_, v)| v)
    }

    /// Number of archived records tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index tracks no archived records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of `size` across every tracked entry.
    pub fn total_archived_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let idx = ArchiveIndex::new();
        idx.insert(
            "r1",
            ArchivalInfo {
                location: "batch-1".into(),
                size: 128,
            },
        );
        let info = idx.get("r1").unwrap();
        assert_eq!(info.location, "batch-1");
        assert_eq!(info.size, 128);
    }

    #[test]
    fn remove_drops_entry() {
        let idx = ArchiveIndex::new();
        idx.insert(
            "r1",
            ArchivalInfo {
                location: "batch-1".into(),
                size: 1,
            },
        );
        assert!(idx.remove("r1").is_some());
        assert!(idx.get("r1").is_none());
    }

    #[test]
    fn total_archived_bytes_sums_entries() {
        let idx = ArchiveIndex::new();
        idx.insert("r1", ArchivalInfo { location: "b1".into(), size: 10 });
        idx.insert("r2", ArchivalInfo { location: "b1".into(), size: 20 });
        assert_eq!(idx.total_archived_bytes(), 30);
    }
}

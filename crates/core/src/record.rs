//! The record type and its metadata, including access-pattern bookkeeping.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Upper bound on the access-history ring (§3 invariants).
pub const MAX_ACCESS_HISTORY: usize = 100;

/// Whether an access-history entry was produced by a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    /// `retrieve` or `query`.
    Read,
    /// `store`, `update`, or `delete`.
    Write,
}

/// How long a record survives before the retention sweeper reclaims it.
///
/// Used directly by the cold tier and by the logs domain, which both keep a
/// `expirationDateKey → set<RecordId>` retention queue of this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RetentionCategory {
    /// 1 day (default for `level=debug` log records).
    Debug,
    /// 30 days (default, and `level=info`).
    #[default]
    Standard,
    /// 90 or 365 days depending on context (`level=warn`/`error`).
    Long,
    /// Never swept; eviction and the retention sweeper both skip these.
    Permanent,
}

impl RetentionCategory {
    /// Default retention window in days, or `None` for [`RetentionCategory::Permanent`].
    pub fn default_days(&self) -> Option<u32> {
        match self {
            RetentionCategory::Debug => Some(1),
            RetentionCategory::Standard => Some(30),
            RetentionCategory::Long => Some(365),
            RetentionCategory::Permanent => None,
        }
    }
}

/// Per-record hot/cold evidence: frequency, last-accessed time, bounded
/// access history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPattern {
    /// Number of accesses observed so far.
    pub frequency: u64,
    /// Unix millis of the most recent access.
    pub last_accessed: i64,
    /// Bounded ring of the last [`MAX_ACCESS_HISTORY`] access timestamps,
    /// oldest first, newest at the tail.
    pub access_history: VecDeque<i64>,
    /// A simple linear estimate of the next access time, in unix millis.
    pub predicted_next_access: i64,
    /// Whether the most recent access was a read or a write.
    pub access_type: AccessType,
}

impl Default for AccessPattern {
    fn default() -> Self {
        AccessPattern {
            frequency: 0,
            last_accessed: 0,
            access_history: VecDeque::new(),
            predicted_next_access: 0,
            access_type: AccessType::Write,
        }
    }
}

impl AccessPattern {
    /// Record an access at `now` (unix millis), bumping frequency, trimming
    /// the ring to [`MAX_ACCESS_HISTORY`], and refreshing the next-access
    /// estimate from the mean inter-access gap observed so far.
    pub fn record_access(&mut self, now: i64, access_type: AccessType) {
        self.frequency += 1;
        self.last_accessed = now;
        self.access_type = access_type;
        self.access_history.push_back(now);
        while self.access_history.len() > MAX_ACCESS_HISTORY {
            self.access_history.pop_front();
        }
        self.predicted_next_access = self.predict_next(now);
    }

    fn predict_next(&self, now: i64) -> i64 {
        if self.access_history.len() < 2 {
            return now;
        }
        let first = *self.access_history.front().unwrap();
        let last = *self.access_history.back().unwrap();
        let span = (last - first).max(0);
        let gaps = (self.access_history.len() - 1) as i64;
        let avg_gap = if gaps > 0 { span / gaps } else { 0 };
        now + avg_gap
    }

    /// Access frequency normalized to "per hour" given the elapsed hours
    /// since the record's last access, as used by the registry's classifier.
    pub fn frequency_per_hour(&self, hours_since_last_access: f64) -> f64 {
        if hours_since_last_access <= 0.0 {
            return self.frequency as f64;
        }
        self.frequency as f64 / hours_since_last_access
    }
}

/// Optional bookkeeping carried alongside a record's payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordMeta {
    /// Where the record originated (producer name, ingest path, etc).
    pub source: Option<String>,
    /// 0-10 priority hint; higher survives eviction pressure longer in
    /// domain-specific query ordering (the base eviction policy itself is
    /// purely recency-based, see `SPEC_FULL.md` §4.1).
    pub priority: Option<u8>,
    /// Caller-managed version counter, bumped on every `update`.
    pub version: Option<u64>,
    /// Free-form tags.
    pub tags: BTreeSet<String>,
    /// Ids of related records, within or across processors.
    pub relationships: BTreeSet<String>,
    /// Size of the record's serialized payload, in bytes.
    pub size: Option<u64>,
    /// Whether `data` is currently stored compressed.
    pub compressed: bool,
    /// Compressor level in `1..=5`, meaningful only when `compressed`.
    pub compression_level: Option<u8>,
    /// Set once a record has been migrated to deep-archive storage.
    pub archival_info: Option<ArchivalInfo>,
    /// Controls auto-expiry via the retention queue.
    pub retention: RetentionCategory,
    /// Hot/cold access evidence.
    pub access_pattern: AccessPattern,
}

/// Where a deep-archived record's bytes now live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalInfo {
    /// Opaque location handle understood by the persistence hook.
    pub location: String,
    /// Size of the archived payload, in bytes.
    pub size: u64,
}

/// A single stored item.
///
/// `data` is an opaque, domain-validated JSON value — the spec treats the
/// payload shape as an implementation detail of the caller, not of the
/// processor (`SPEC_FULL.md` §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique within the owning processor.
    pub id: String,
    /// The domain this record belongs to. Informational; the processor a
    /// record lives in already implies its domain.
    pub domain: Domain,
    /// Optional caller-defined record type (distinct from `domain`/`tier`,
    /// see `SPEC_FULL.md` §9 open question (a)).
    pub record_type: Option<String>,
    /// Unix millis set by the producer.
    pub timestamp: i64,
    /// Opaque structured payload.
    pub data: serde_json::Value,
    /// Metadata and access-pattern bookkeeping.
    pub metadata: RecordMeta,
}

impl Record {
    /// Construct a record with default metadata.
    pub fn new(id: impl Into<String>, domain: Domain, timestamp: i64, data: serde_json::Value) -> Self {
        Record {
            id: id.into(),
            domain,
            record_type: None,
            timestamp,
            data,
            metadata: RecordMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_history_never_exceeds_bound() {
        let mut ap = AccessPattern::default();
        for i in 0..250 {
            ap.record_access(i, AccessType::Read);
        }
        assert_eq!(ap.access_history.len(), MAX_ACCESS_HISTORY);
        assert_eq!(*ap.access_history.back().unwrap(), 249);
        assert_eq!(ap.frequency, 250);
    }

    #[test]
    fn frequency_per_hour_handles_zero_elapsed() {
        let mut ap = AccessPattern::default();
        ap.record_access(0, AccessType::Read);
        assert_eq!(ap.frequency_per_hour(0.0), 1.0);
    }

    #[test]
    fn retention_defaults_match_spec() {
        assert_eq!(RetentionCategory::Debug.default_days(), Some(1));
        assert_eq!(RetentionCategory::Standard.default_days(), Some(30));
        assert_eq!(RetentionCategory::Long.default_days(), Some(365));
        assert_eq!(RetentionCategory::Permanent.default_days(), None);
    }
}

//! Append-only migration journal.
//!
//! Every [`MigrationPlan`] transition is appended here before the registry
//! acts on it, mirroring the teacher's "durability point precedes
//! visibility" ordering (`concurrency/src/manager.rs`): a plan is durable in
//! the journal before cutover is allowed to touch routing.

use parking_lot::Mutex;
use tierdb_core::migration::MigrationPlan;
use tracing::debug;

/// In-memory append-only log of migration plans, keyed by plan id for
/// lookup and kept in append order for history inspection.
#[derive(Default)]
pub struct MigrationJournal {
    entries: Mutex<Vec<MigrationPlan>>,
}

impl MigrationJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        MigrationJournal::default()
    }

    /// Append a new or updated plan. Updates in place if `plan.id` is
    /// already present (a plan's status changes over its lifetime; the
    /// journal keeps one entry per plan, not one per transition).
    pub fn record(&self, plan: MigrationPlan) {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.iter_mut().find(|p| p.id == plan.id) {
            debug!(plan_id = %plan.id, status = ?plan.status, "migration plan updated");
            *existing = plan;
        } else {
            debug!(plan_id = %plan.id, source_id = %plan.source_id, target_id = %plan.target_id, "migration plan journaled");
            entries.push(plan);
        }
    }

    /// Every plan recorded so far, oldest first.
    pub fn history(&self) -> Vec<MigrationPlan> {
        self.entries.lock().clone()
    }

    /// Every plan recorded for a given processor id, as either source or
    /// target, oldest first.
    pub fn history_for(&self, processor_id: &str) -> Vec<MigrationPlan> {
        self.entries
            .lock()
            .iter()
            .filter(|p| p.source_id == processor_id || p.target_id == processor_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierdb_core::tier::Tier;

    #[test]
    fn record_then_update_replaces_entry() {
        let journal = MigrationJournal::new();
        let mut plan = MigrationPlan::new("m1", "src", "tgt", Tier::Hot, 1000, 0);
        journal.record(plan.clone());
        plan.complete(500);
        journal.record(plan);

        let history = journal.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].end_time, Some(500));
    }

    #[test]
    fn history_for_filters_by_processor_id() {
        let journal = MigrationJournal::new();
        journal.record(MigrationPlan::new("m1", "src", "tgt", Tier::Hot, 1000, 0));
        journal.record(MigrationPlan::new("m2", "other-src", "other-tgt", Tier::Cold, 1000, 0));

        assert_eq!(journal.history_for("src").len(), 1);
        assert_eq!(journal.history_for("nonexistent").len(), 0);
    }
}

//! Migration plans and the registry-level processor state machine
//! (`SPEC_FULL.md` §3 "Lifecycle", §4.5 "Migration protocol").

use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Lifecycle state the registry tracks for each processor.
///
/// `Migrating` is orthogonal to the rest of the chain: it is allowed from
/// `Healthy` or `Degraded` and returns to whichever state applied when the
/// migration concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorState {
    /// Constructed but not yet initialized.
    Created,
    /// Factory has been invoked; optimizer/warm-up running.
    Initializing,
    /// Serving traffic normally.
    Healthy,
    /// Serving traffic, but metrics crossed the degraded threshold.
    Degraded,
    /// Removed from routing by the health monitor; recovery in progress.
    Unhealthy,
    /// A hot↔cold migration is in flight for this processor.
    Migrating,
    /// No longer accepting new requests; in-flight requests draining.
    Draining,
    /// Shut down and unregistered.
    Terminated,
}

impl ProcessorState {
    /// Whether a processor in this state may legally enter `Migrating`.
    pub fn can_start_migration(&self) -> bool {
        matches!(self, ProcessorState::Healthy | ProcessorState::Degraded)
    }

    /// Whether a processor in this state is routable (present in the
    /// registry's routing maps).
    pub fn is_routable(&self) -> bool {
        matches!(self, ProcessorState::Healthy | ProcessorState::Degraded)
    }
}

/// Status of a single migration plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationStatus {
    /// Plan created, target not yet registered.
    Pending,
    /// Target registered; streaming records source→target.
    Copying,
    /// Routing atomically swapped from source to target.
    CutOver,
    /// Source unregistered; plan complete.
    Completed,
    /// Failed before cutover; source remains canonical.
    Failed,
}

/// A record of one hot↔cold tier change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Unique id for this plan.
    pub id: String,
    /// Processor being migrated away from.
    pub source_id: String,
    /// Processor being migrated to (registered at step 2 of the protocol).
    pub target_id: String,
    /// Tier being migrated away from.
    pub source_tier: Tier,
    /// Tier being migrated to.
    pub target_tier: Tier,
    /// Always `"copy"` for the single strategy this spec defines.
    pub strategy: &'static str,
    /// Current status.
    pub status: MigrationStatus,
    /// Unix millis the plan was created.
    pub start_time: i64,
    /// Unix millis the plan reached a terminal status, if it has.
    pub end_time: Option<i64>,
    /// Rough estimate computed from source record count at plan time.
    pub estimated_duration_ms: i64,
    /// Set when `status == Failed`.
    pub failure_reason: Option<String>,
}

impl MigrationPlan {
    /// Start a new plan in `Pending` status.
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        source_tier: Tier,
        estimated_duration_ms: i64,
        now: i64,
    ) -> Self {
        MigrationPlan {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            source_tier,
            target_tier: source_tier.opposite(),
            strategy: "copy",
            status: MigrationStatus::Pending,
            start_time: now,
            end_time: None,
            estimated_duration_ms,
            failure_reason: None,
        }
    }

    /// Mark the plan completed at `now`.
    pub fn complete(&mut self, now: i64) {
        self.status = MigrationStatus::Completed;
        self.end_time = Some(now);
    }

    /// Mark the plan failed at `now` with `reason`.
    pub fn fail(&mut self, now: i64, reason: impl Into<String>) {
        self.status = MigrationStatus::Failed;
        self.end_time = Some(now);
        self.failure_reason = Some(reason.into());
    }
}

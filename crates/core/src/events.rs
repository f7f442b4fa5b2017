//! Typed publish/subscribe event bus.
//!
//! `SPEC_FULL.md` §9 models cross-cutting event emission as "a typed event
//! bus per processor and a registry-level bus", composition rather than
//! inheritance. Both buses here share one implementation parameterized over
//! the event type; a processor owns an `EventBus<ProcessorEvent>`, the
//! registry owns an `EventBus<RegistryEvent>`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Events a processor publishes (`SPEC_FULL.md` §6 "Event surface").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProcessorEvent {
    /// A record was written via `store`/`update`.
    RecordStored { processor_id: String, record_id: String },
    /// A record was read via `retrieve`.
    RecordRetrieved { processor_id: String, record_id: String },
    /// A record was removed via `delete`.
    RecordDeleted { processor_id: String, record_id: String },
    /// A `query` completed; `result_count` is the number of records returned.
    QueryExecuted {
        processor_id: String,
        result_count: usize,
    },
    /// A cold-tier batch was compressed and committed.
    BatchProcessed { processor_id: String, record_count: usize },
    /// The retention sweeper deleted expired records.
    RetentionCleanup { processor_id: String, deleted_count: usize },
    /// A record crossed into deep-archive storage.
    DeepArchiveMigration { processor_id: String, record_id: String },
    /// The processor finished `shutdown`.
    Shutdown { processor_id: String },
    /// An operation failed; carried alongside the caller's own `Result`.
    Error { processor_id: String, detail: String },
}

/// Events the registry publishes (`SPEC_FULL.md` §6 "Event surface").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A processor was registered and inserted into routing.
    Registered { processor_id: String },
    /// A processor was unregistered (graceful or forced).
    Unregistered { processor_id: String },
    /// The health monitor demoted a processor and removed it from routing.
    Unhealthy { processor_id: String },
    /// A restarted processor was re-inserted into routing.
    Recovered { processor_id: String },
    /// A processor's restart failed; a replacement with a fresh id took
    /// over its place in routing.
    Replaced { old_processor_id: String, new_processor_id: String },
    /// A hot↔cold migration completed and cutover succeeded.
    Migrated {
        source_id: String,
        target_id: String,
    },
    /// A migration failed before cutover; the source remains canonical.
    MigrationFailed { source_id: String, reason: String },
}

/// A minimal, in-process pub/sub bus.
///
/// Subscribers are plain closures invoked synchronously, in subscription
/// order, on the thread that calls [`EventBus::publish`]. There is no
/// buffering or replay: a subscriber only sees events published after it
/// subscribes.
pub struct EventBus<E> {
    subscribers: Mutex<Vec<Arc<dyn Fn(&E) + Send + Sync>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<E> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Returns nothing to unsubscribe by; buses in
    /// this system live as long as their owning processor/registry.
    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) {
        self.subscribers.lock().push(Arc::new(handler));
    }

    /// Invoke every subscriber with `event`, in subscription order.
    pub fn publish(&self, event: E) {
        let subs = self.subscribers.lock();
        for sub in subs.iter() {
            sub(&event);
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

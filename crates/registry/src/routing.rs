//! Domain and tier routing maps.
//!
//! Grounded on the teacher's `PrimitiveRegistry` (`storage/src/registry.rs`):
//! the same "type id -> instance, plus a secondary index keyed a different
//! way" shape, generalized from `u8` type ids to `(Domain, Tier)` and scaled
//! up to one-to-many (many processors can serve the same domain).

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tierdb_core::domain::Domain;
use tierdb_core::tier::Tier;

/// Tracks which processor ids serve each domain and each tier, independent
/// of whether those ids are currently healthy (the health monitor prunes
/// unhealthy ids separately via `Registry::routable_ids`).
#[derive(Default)]
pub struct RoutingTable {
    domain_routing: RwLock<HashMap<Domain, Vec<String>>>,
    tier_routing: RwLock<HashMap<Tier, Vec<String>>>,
    round_robin: DashMap<Domain, AtomicUsize>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        RoutingTable::default()
    }

    /// Add `id` to both the domain and tier routing lists.
    pub fn insert(&self, domain: Domain, tier: Tier, id: &str) {
        self.domain_routing
            .write()
            .entry(domain)
            .or_default()
            .push(id.to_string());
        self.tier_routing.write().entry(tier).or_default().push(id.to_string());
    }

    /// Remove `id` from both routing lists.
    pub fn remove(&self, domain: Domain, tier: Tier, id: &str) {
        if let Some(ids) = self.domain_routing.write().get_mut(&domain) {
            ids.retain(|x| x != id);
        }
        if let Some(ids) = self.tier_routing.write().get_mut(&tier) {
            ids.retain(|x| x != id);
        }
    }

    /// Every id routed for `domain`, in registration order.
    pub fn domain_ids(&self, domain: Domain) -> Vec<String> {
        self.domain_routing.read().get(&domain).cloned().unwrap_or_default()
    }

    /// Every id routed for `tier`, in registration order.
    pub fn tier_ids(&self, tier: Tier) -> Vec<String> {
        self.tier_routing.read().get(&tier).cloned().unwrap_or_default()
    }

    /// Every id routed to any domain.
    pub fn all_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .domain_routing
            .read()
            .values()
            .flat_map(|v| v.iter().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Advance and return the next round-robin index for `domain`, modulo
    /// `len`. A fresh counter starts at `0`; `len == 0` always returns `0`.
    pub fn next_round_robin_index(&self, domain: Domain, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let counter = self.round_robin.entry(domain).or_insert_with(|| AtomicUsize::new(0));
        counter.fetch_add(1, Ordering::Relaxed) % len
    }
}

//! Replica selection policies (`SPEC_FULL.md` §4.5).

use rand::Rng;
use std::sync::atomic::AtomicUsize;
use tierdb_core::config::LoadBalancingStrategy;
use tierdb_core::domain::Domain;
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;

use crate::routing::RoutingTable;

/// One candidate replica, as seen by the selector.
pub struct Candidate<'a> {
    pub id: &'a str,
    pub metrics: &'a ProcessorMetrics,
    pub health: &'a HealthReport,
}

/// Pick one replica from `candidates` per `strategy`. `domain` and `routing`
/// back round-robin, whose counter must survive across calls.
pub fn select<'a>(
    strategy: LoadBalancingStrategy,
    domain: Domain,
    candidates: &[Candidate<'a>],
    routing: &RoutingTable,
) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }
    match strategy {
        LoadBalancingStrategy::RoundRobin => {
            let idx = routing.next_round_robin_index(domain, candidates.len());
            Some(candidates[idx].id)
        }
        LoadBalancingStrategy::Random => {
            let idx = rand::thread_rng().gen_range(0..candidates.len());
            Some(candidates[idx].id)
        }
        LoadBalancingStrategy::LeastLoaded => candidates
            .iter()
            .min_by(|a, b| load_score(a).partial_cmp(&load_score(b)).unwrap())
            .map(|c| c.id),
        LoadBalancingStrategy::Weighted => weighted_pick(candidates),
    }
}

/// `score = cpu + memory + avg_query_time/1000`; lower is less loaded.
fn load_score(c: &Candidate<'_>) -> f64 {
    c.health.cpu_usage + c.health.memory_usage + c.metrics.average_response_time_ms / 1000.0
}

/// `weight = (1 / avg_query_time) * (1 - error_rate)`, cumulative pick.
fn weight(metrics: &ProcessorMetrics) -> f64 {
    let avg = metrics.average_response_time_ms.max(0.001);
    (1.0 / avg) * (1.0 - metrics.error_rate).max(0.0)
}

fn weighted_pick<'a>(candidates: &[Candidate<'a>]) -> Option<&'a str> {
    let weights: Vec<f64> = candidates.iter().map(|c| weight(c.metrics)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return candidates.first().map(|c| c.id);
    }
    let mut threshold = rand::thread_rng().gen_range(0.0..total);
    for (c, w) in candidates.iter().zip(weights.iter()) {
        if threshold < *w {
            return Some(c.id);
        }
        threshold -= w;
    }
    candidates.last().map(|c| c.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate<'a>(id: &'a str, metrics: &'a ProcessorMetrics, health: &'a HealthReport) -> Candidate<'a> {
        Candidate { id, metrics, health }
    }

    #[test]
    fn round_robin_cycles_across_three_candidates() {
        let routing = RoutingTable::new();
        let metrics = ProcessorMetrics::default();
        let health = HealthReport {
            status: tierdb_core::health::HealthStatus::Healthy,
            uptime_secs: 0,
            memory_usage: 0.0,
            cpu_usage: 0.0,
            disk_usage: 0.0,
        };
        let candidates = vec![
            candidate("p1", &metrics, &health),
            candidate("p2", &metrics, &health),
            candidate("p3", &metrics, &health),
        ];
        let picks: Vec<&str> = (0..4)
            .map(|_| select(LoadBalancingStrategy::RoundRobin, Domain::User, &candidates, &routing).unwrap())
            .collect();
        assert_eq!(picks, vec!["p1", "p2", "p3", "p1"]);
    }

    #[test]
    fn least_loaded_picks_lowest_score() {
        let routing = RoutingTable::new();
        let busy = ProcessorMetrics {
            average_response_time_ms: 900.0,
            ..ProcessorMetrics::default()
        };
        let idle = ProcessorMetrics::default();
        let busy_health = HealthReport {
            status: tierdb_core::health::HealthStatus::Degraded,
            uptime_secs: 0,
            memory_usage: 80.0,
            cpu_usage: 80.0,
            disk_usage: 0.0,
        };
        let idle_health = HealthReport {
            status: tierdb_core::health::HealthStatus::Healthy,
            uptime_secs: 0,
            memory_usage: 5.0,
            cpu_usage: 5.0,
            disk_usage: 0.0,
        };
        let candidates = vec![candidate("busy", &busy, &busy_health), candidate("idle", &idle, &idle_health)];
        let pick = select(LoadBalancingStrategy::LeastLoaded, Domain::User, &candidates, &routing);
        assert_eq!(pick, Some("idle"));
    }

    #[test]
    fn empty_candidates_selects_nothing() {
        let routing = RoutingTable::new();
        let picks: Vec<Candidate> = Vec::new();
        assert!(select(LoadBalancingStrategy::RoundRobin, Domain::User, &picks, &routing).is_none());
    }

    #[test]
    fn weighted_and_random_always_pick_a_listed_candidate() {
        let routing = RoutingTable::new();
        let metrics = ProcessorMetrics::default();
        let health = HealthReport {
            status: tierdb_core::health::HealthStatus::Healthy,
            uptime_secs: 0,
            memory_usage: 0.0,
            cpu_usage: 0.0,
            disk_usage: 0.0,
        };
        let candidates = vec![candidate("p1", &metrics, &health), candidate("p2", &metrics, &health)];
        for strategy in [LoadBalancingStrategy::Weighted, LoadBalancingStrategy::Random] {
            let pick = select(strategy, Domain::User, &candidates, &routing).unwrap();
            assert!(pick == "p1" || pick == "p2");
        }
    }
}

//! The latency/capacity axis of a processor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hot (latency-optimized) or cold (capacity/compression-optimized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Uncompressed, large cache, every write immediately durable in memory.
    Hot,
    /// Batched, compressed, retention-swept.
    Cold,
}

impl Tier {
    /// The other tier. Used by the classifier to decide migration targets.
    pub fn opposite(&self) -> Tier {
        match self {
            Tier::Hot => Tier::Cold,
            Tier::Cold => Tier::Hot,
        }
    }

    /// Lowercase tag, as used in routing-map keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Cold => "cold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse performance classification reported in processor metadata.
///
/// Distinct from [`Tier`]: `performance_tier` describes the SLA a processor
/// is expected to meet, `Tier` describes its storage strategy. A hot
/// processor is normally `Realtime`; nothing prevents a cold processor from
/// also being configured `Realtime` for a low-traffic domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    /// Sub-millisecond target latency.
    Realtime,
    /// Best-effort latency.
    Standard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involutive() {
        assert_eq!(Tier::Hot.opposite(), Tier::Cold);
        assert_eq!(Tier::Cold.opposite().opposite(), Tier::Cold);
    }
}

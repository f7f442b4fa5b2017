//! Per-processor and registry-wide configuration, with validated defaults.
//!
//! Configuration is plain, `serde`-serializable structs rather than a loose
//! string-keyed map — every key named in `SPEC_FULL.md` §6 has a field and a
//! default, enforced by [`ProcessorConfig::validate`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Per-processor consistency target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// Linearizable within the processor.
    Strong,
    /// Default: replicas converge, but may briefly disagree.
    Eventual,
    /// Best-effort; no convergence guarantee.
    Weak,
}

impl Default for ConsistencyLevel {
    fn default() -> Self {
        ConsistencyLevel::Eventual
    }
}

/// Per-processor configuration (`SPEC_FULL.md` §3 "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Eviction triggers once `record_count >= max_records`.
    pub max_records: usize,
    /// Soft cap on `total_size`, in bytes. Informational unless a domain
    /// chooses to enforce it.
    pub max_size: u64,
    /// Whether the cold-tier compressor is engaged. Ignored by hot
    /// processors, which are never compressed.
    pub compression_enabled: bool,
    /// Number of physically provisioned replicas serving this domain;
    /// `replication_factor` must not exceed it (§3 invariants).
    pub replication_factor: u8,
    /// Hot-tier in-memory cache size (record count).
    pub cache_size: usize,
    /// Size of the simulated connection pool exposed in metadata.
    pub connection_pool_size: usize,
    /// Default deadline applied to registry operations against this
    /// processor.
    pub query_timeout: Duration,
    /// How often the persistence hook is asked to checkpoint.
    pub backup_frequency: Duration,
    /// Whether persisted batches/records are encrypted by the persistence
    /// hook. The core does not implement encryption itself.
    pub encryption_enabled: bool,
    /// Whether domain-fixed indices are maintained automatically on every
    /// write.
    pub auto_indexing: bool,
    /// Target consistency level.
    pub consistency_level: ConsistencyLevel,
    /// Free-form extension point for domain- or deployment-specific
    /// settings that don't warrant a first-class field.
    pub custom_properties: HashMap<String, serde_json::Value>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            max_records: 100_000,
            max_size: 1 << 30,
            compression_enabled: false,
            replication_factor: 1,
            cache_size: 100,
            connection_pool_size: 10,
            query_timeout: Duration::from_secs(30),
            backup_frequency: Duration::from_secs(3600),
            encryption_enabled: false,
            auto_indexing: true,
            consistency_level: ConsistencyLevel::Eventual,
            custom_properties: HashMap::new(),
        }
    }
}

impl ProcessorConfig {
    /// Reject configurations that violate `SPEC_FULL.md` §3 invariants.
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.replication_factor) {
            return Err(Error::InvalidConfiguration(format!(
                "replication_factor must be in 1..=5, got {}",
                self.replication_factor
            )));
        }
        if self.max_records == 0 {
            return Err(Error::InvalidConfiguration(
                "max_records must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Which load-balancing policy the registry uses to pick a replica within a
/// domain (`SPEC_FULL.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadBalancingStrategy {
    /// Per-domain monotonically increasing counter mod `|set|`.
    RoundRobin,
    /// `weight = (1 / avg_query_time) * (1 - error_rate)`, cumulative pick.
    Weighted,
    /// `score = cpu + memory + avg_query_time/1000`, pick min.
    LeastLoaded,
    /// Uniform random.
    Random,
}

impl Default for LoadBalancingStrategy {
    fn default() -> Self {
        LoadBalancingStrategy::RoundRobin
    }
}

/// Auto-scaling hints; the registry doesn't provision infrastructure itself
/// but exposes these thresholds for an external scaler to act on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AutoScalingConfig {
    /// Whether auto-scaling signals are computed at all.
    pub enabled: bool,
    /// Floor on the number of instances per domain.
    pub min_instances: u32,
    /// Ceiling on the number of instances per domain.
    pub max_instances: u32,
    /// Load fraction above which a scale-up signal fires.
    pub scale_up_threshold: f64,
    /// Load fraction below which a scale-down signal fires.
    pub scale_down_threshold: f64,
}

impl Default for AutoScalingConfig {
    fn default() -> Self {
        AutoScalingConfig {
            enabled: false,
            min_instances: 1,
            max_instances: 1,
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.3,
        }
    }
}

/// Retention defaults applied when a domain doesn't specify its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// A record idle longer than this (millis) is eligible for the
    /// cost-tier migration sweep, subject to the frequency/size thresholds
    /// in [`RegistryConfig`].
    pub max_inactive_time_ms: i64,
    /// Whether archived batches are compressed.
    pub compression_enabled: bool,
    /// Logical archive storage class name, passed through to the
    /// persistence hook.
    pub archive_storage: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            max_inactive_time_ms: 86_400_000,
            compression_enabled: true,
            archive_storage: true,
        }
    }
}

/// Registry-wide configuration (`SPEC_FULL.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Access-frequency-per-hour above which a cold processor migrates to hot.
    pub hot_threshold: f64,
    /// Access-frequency-per-hour below which a hot processor migrates to cold.
    pub cold_threshold: f64,
    /// Minimum time between migrations for a single processor.
    pub migration_cooldown: Duration,
    /// Health-poll interval.
    pub health_check_interval: Duration,
    /// Default load-balancing policy for new domains.
    pub load_balancing_strategy: LoadBalancingStrategy,
    /// Auto-scaling hints.
    pub auto_scaling: AutoScalingConfig,
    /// Retention defaults.
    pub retention: RetentionConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            hot_threshold: 100.0,
            cold_threshold: 10.0,
            migration_cooldown: Duration::from_millis(3_600_000),
            health_check_interval: Duration::from_millis(30_000),
            load_balancing_strategy: LoadBalancingStrategy::default(),
            auto_scaling: AutoScalingConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

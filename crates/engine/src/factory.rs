//! Builds a processor for a given `(domain, tier)` pair
//! (`SPEC_FULL.md` §4.4, §6 `registerFactory`).

use crate::cold::ColdProcessor;
use crate::domain::{self, ChatProcessor, LogsColdProcessor, StatsProcessor, UserProcessor};
use crate::hot::HotProcessor;
use std::sync::Arc;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::domain::Domain;
use tierdb_core::error::{Error, Result};
use tierdb_core::tier::Tier;
use tierdb_core::traits::{Compressor, PersistenceHook, Processor, ProcessorFactory};
use tierdb_storage::{ZstdCompressor, DEFAULT_BATCH_SIZE};

/// The workspace's only [`ProcessorFactory`]: dispatches on `(domain,
/// tier)` to the concrete processor type, wiring in a shared compressor and
/// persistence hook.
pub struct DomainTierFactory {
    domain: Domain,
    tier: Tier,
    compressor: Arc<dyn Compressor>,
    persistence: Option<Arc<dyn PersistenceHook>>,
    batch_size: usize,
}

impl DomainTierFactory {
    /// Build a factory for `(domain, tier)` with the default zstd
    /// compressor.
    pub fn new(domain: Domain, tier: Tier, persistence: Option<Arc<dyn PersistenceHook>>) -> Self {
        DomainTierFactory {
            domain,
            tier,
            compressor: Arc::new(ZstdCompressor),
            persistence,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the default compressor, e.g. with
    /// [`tierdb_storage::NoopCompressor`] in tests.
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }
}

impl ProcessorFactory for DomainTierFactory {
    fn create(&self, id: &str, config: ProcessorConfig) -> Result<Arc<dyn Processor>> {
        let indexed_fields = domain::indexed_fields_for(self.domain);

        match (self.domain, self.tier) {
            (Domain::Logs, Tier::Hot) => Err(Error::InvalidConfiguration(
                "the logs domain is cold-tier only".into(),
            )),
            (Domain::Logs, Tier::Cold) => {
                let cold = ColdProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.batch_size,
                    self.compressor.clone(),
                    self.persistence.clone(),
                );
                Ok(Arc::new(LogsColdProcessor::new(cold)))
            }
            (Domain::User, Tier::Hot) => {
                let hot: Arc<dyn Processor> = Arc::new(HotProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.persistence.clone(),
                ));
                Ok(Arc::new(UserProcessor::new(hot)))
            }
            (Domain::User, Tier::Cold) => {
                let cold: Arc<dyn Processor> = Arc::new(ColdProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.batch_size,
                    self.compressor.clone(),
                    self.persistence.clone(),
                ));
                Ok(Arc::new(UserProcessor::new(cold)))
            }
            (Domain::Chat, Tier::Hot) => {
                let hot: Arc<dyn Processor> = Arc::new(HotProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.persistence.clone(),
                ));
                Ok(Arc::new(ChatProcessor::new(hot)))
            }
            (Domain::Chat, Tier::Cold) => {
                let cold: Arc<dyn Processor> = Arc::new(ColdProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.batch_size,
                    self.compressor.clone(),
                    self.persistence.clone(),
                ));
                Ok(Arc::new(ChatProcessor::new(cold)))
            }
            (Domain::Stats, Tier::Hot) => {
                let hot: Arc<dyn Processor> = Arc::new(HotProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.persistence.clone(),
                ));
                Ok(Arc::new(StatsProcessor::new(hot)))
            }
            (Domain::Stats, Tier::Cold) => {
                let cold: Arc<dyn Processor> = Arc::new(ColdProcessor::new(
                    id,
                    self.domain,
                    config,
                    indexed_fields,
                    self.batch_size,
                    self.compressor.clone(),
                    self.persistence.clone(),
                ));
                Ok(Arc::new(StatsProcessor::new(cold)))
            }
            (_, Tier::Hot) => Ok(Arc::new(HotProcessor::new(
                id,
                self.domain,
                config,
                indexed_fields,
                self.persistence.clone(),
            ))),
            (_, Tier::Cold) => Ok(Arc::new(ColdProcessor::new(
                id,
                self.domain,
                config,
                indexed_fields,
                self.batch_size,
                self.compressor.clone(),
                self.persistence.clone(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierdb_storage::NoopCompressor;

    #[test]
    fn logs_hot_combination_is_rejected() {
        let factory = DomainTierFactory::new(Domain::Logs, Tier::Hot, None);
        assert!(factory.create("p1", ProcessorConfig::default()).is_err());
    }

    #[test]
    fn logs_cold_builds_a_processor() {
        let factory =
            DomainTierFactory::new(Domain::Logs, Tier::Cold, None).with_compressor(Arc::new(NoopCompressor));
        assert!(factory.create("p1", ProcessorConfig::default()).is_ok());
    }

    #[test]
    fn user_hot_builds_a_processor() {
        let factory = DomainTierFactory::new(Domain::User, Tier::Hot, None);
        assert!(factory.create("p1", ProcessorConfig::default()).is_ok());
    }

    #[test]
    fn stats_hot_and_cold_both_build_a_wrapped_processor() {
        let hot = DomainTierFactory::new(Domain::Stats, Tier::Hot, None);
        assert!(hot.create("p1", ProcessorConfig::default()).is_ok());
        let cold =
            DomainTierFactory::new(Domain::Stats, Tier::Cold, None).with_compressor(Arc::new(NoopCompressor));
        assert!(cold.create("p2", ProcessorConfig::default()).is_ok());
    }
}

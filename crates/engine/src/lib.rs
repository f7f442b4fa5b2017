//! Processor implementations: the shared base, hot/cold tier
//! specializations, domain specializations, the processor factory, and the
//! background task scheduler (`SPEC_FULL.md` §4).

pub mod background;
pub mod cold;
pub mod domain;
pub mod factory;
pub mod hot;
pub mod processor_base;

pub use background::{BackgroundScheduler, BackpressureError, SchedulerStats, TaskPriority};
pub use cold::ColdProcessor;
pub use factory::DomainTierFactory;
pub use hot::HotProcessor;
pub use processor_base::ProcessorBase;

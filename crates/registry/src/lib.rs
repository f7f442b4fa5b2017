//! Processor registry: registration, routing, load-balanced query
//! dispatch, and the health/classifier/migration maintenance loops
//! (`SPEC_FULL.md` §4.5, §6).

pub mod load_balancing;
pub mod registry;
pub mod routing;

pub use registry::Registry;
pub use routing::RoutingTable;

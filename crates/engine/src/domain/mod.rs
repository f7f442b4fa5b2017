//! Domain specializations: fixed index sets and payload validation layered
//! on top of the shared [`crate::processor_base::ProcessorBase`]
//! (`SPEC_FULL.md` §4.4).
//!
//! A domain specialization owns a tier processor (hot or cold) and adds
//! nothing else to the `Processor` contract — validation happens before
//! `store` is called, not inside it, so a domain wrapper composes cleanly
//! with either tier.

pub mod chat;
pub mod logs;
pub mod stats;
pub mod user;

pub use chat::{chat_indexed_fields, validate_chat_payload, ChatProcessor};
pub use logs::{level_retention_days, logs_indexed_fields, validate_logs_payload, LogsColdProcessor};
pub use stats::{stats_indexed_fields, validate_stats_payload, AggregationType, StatsAggregationCache, StatsProcessor};
pub use user::{user_indexed_fields, validate_user_payload, UserProcessor};

use tierdb_core::domain::Domain;
use tierdb_core::error::Result;
use tierdb_core::record::Record;

/// Fixed index names for a domain's store. `Generic` has none: it's a plain
/// record store with no schema assumptions.
pub fn indexed_fields_for(domain: Domain) -> Vec<String> {
    match domain {
        Domain::User => user_indexed_fields(),
        Domain::Chat => chat_indexed_fields(),
        Domain::Stats => stats_indexed_fields(),
        Domain::Logs => logs_indexed_fields(),
        Domain::Generic => Vec::new(),
    }
}

/// Validate a record's payload against its domain's required shape, before
/// it is handed to a processor's `store`. `Generic` accepts anything.
pub fn validate_for_domain(domain: Domain, record: &Record) -> Result<()> {
    match domain {
        Domain::User => validate_user_payload(record),
        Domain::Chat => validate_chat_payload(record),
        Domain::Stats => validate_stats_payload(record),
        Domain::Logs => validate_logs_payload(record),
        Domain::Generic => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generic_domain_has_no_fixed_indices_and_accepts_anything() {
        assert!(indexed_fields_for(Domain::Generic).is_empty());
        let record = Record::new("r1", Domain::Generic, 0, json!({"anything": true}));
        assert!(validate_for_domain(Domain::Generic, &record).is_ok());
    }

    #[test]
    fn user_domain_indexes_email_token_and_permission() {
        let fields = indexed_fields_for(Domain::User);
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"token".to_string()));
        assert!(fields.contains(&"permission".to_string()));
    }
}

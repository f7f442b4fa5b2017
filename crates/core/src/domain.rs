//! The business-type axis of a processor.
//!
//! Orthogonal to [`crate::tier::Tier`] (see `SPEC_FULL.md` §9, open question
//! (a)): a processor has exactly one domain and exactly one tier, chosen
//! independently.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The domain a processor stores records for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// User accounts, credentials, permissions.
    User,
    /// Chat conversations and messages.
    Chat,
    /// Numeric metrics and aggregates.
    Stats,
    /// Application/service log lines.
    Logs,
    /// No fixed index set or validation; a plain record store.
    Generic,
}

impl Domain {
    /// All domains, in a stable order (used for fan-out iteration).
    pub fn all() -> &'static [Domain] {
        &[
            Domain::User,
            Domain::Chat,
            Domain::Stats,
            Domain::Logs,
            Domain::Generic,
        ]
    }

    /// Lowercase tag, as used in routing-map keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::User => "user",
            Domain::Chat => "chat",
            Domain::Stats => "stats",
            Domain::Logs => "logs",
            Domain::Generic => "generic",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_domains_round_trip_through_as_str() {
        for d in Domain::all() {
            assert!(!d.as_str().is_empty());
        }
    }
}

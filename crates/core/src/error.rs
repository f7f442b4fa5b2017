//! Error types shared across the registry and every processor.
//!
//! One flat enum carries every stable error code named in the external
//! interface contract, so callers can match on `code()` without depending
//! on which crate raised the error.

use thiserror::Error;

/// Result type alias used throughout tierdb.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable, externally-visible error codes.
///
/// These are the codes a caller is expected to match on; `Error`'s `Display`
/// impl adds a human-readable detail on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No processor was available to serve a query (all candidates failed
    /// or none are registered for the domain).
    NoProcessorsAvailable,
    /// A processor id was referenced but is not registered.
    ProcessorNotFound,
    /// A processor is at `maxRecords`/`maxSize` even after eviction.
    CapacityExceeded,
    /// A cold processor's batch buffer is above its high-water mark.
    BatchBufferBusy,
    /// A migration was requested before `migrationCooldown` elapsed.
    MigrationCooldown,
    /// A migration was requested while one is already in flight for the id.
    MigrationInProgress,
    /// A health check did not complete before its deadline.
    HealthCheckTimeout,
    /// A configuration value failed validation.
    InvalidConfiguration,
    /// A secondary index was found to disagree with the record store.
    IndexInconsistency,
}

impl ErrorCode {
    /// Short machine-readable name, as it would appear in logs or APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoProcessorsAvailable => "NoProcessorsAvailable",
            ErrorCode::ProcessorNotFound => "ProcessorNotFound",
            ErrorCode::CapacityExceeded => "CapacityExceeded",
            ErrorCode::BatchBufferBusy => "BatchBufferBusy",
            ErrorCode::MigrationCooldown => "MigrationCooldown",
            ErrorCode::MigrationInProgress => "MigrationInProgress",
            ErrorCode::HealthCheckTimeout => "HealthCheckTimeout",
            ErrorCode::InvalidConfiguration => "InvalidConfiguration",
            ErrorCode::IndexInconsistency => "IndexInconsistency",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for all tierdb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ErrorCode::NoProcessorsAvailable`].
    #[error("no processors available: {0}")]
    NoProcessorsAvailable(String),

    /// See [`ErrorCode::ProcessorNotFound`].
    #[error("processor not found: {0}")]
    ProcessorNotFound(String),

    /// See [`ErrorCode::CapacityExceeded`].
    #[error("capacity exceeded on processor {processor_id}: {detail}")]
    CapacityExceeded {
        /// Processor that rejected the write.
        processor_id: String,
        /// Human-readable detail.
        detail: String,
    },

    /// See [`ErrorCode::BatchBufferBusy`].
    #[error("batch buffer busy on processor {0}, retry")]
    BatchBufferBusy(String),

    /// See [`ErrorCode::MigrationCooldown`].
    #[error("processor {0} is within its migration cooldown window")]
    MigrationCooldown(String),

    /// See [`ErrorCode::MigrationInProgress`].
    #[error("a migration is already in progress for processor {0}")]
    MigrationInProgress(String),

    /// See [`ErrorCode::HealthCheckTimeout`].
    #[error("health check timed out for processor {0}")]
    HealthCheckTimeout(String),

    /// See [`ErrorCode::InvalidConfiguration`].
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// See [`ErrorCode::IndexInconsistency`].
    #[error("index inconsistency on processor {processor_id}, index {index_name}: {detail}")]
    IndexInconsistency {
        /// Processor whose index disagreed with the record store.
        processor_id: String,
        /// Name of the offending index.
        index_name: String,
        /// Human-readable detail.
        detail: String,
    },

    /// Record failed domain validation before any state was mutated.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// The stable error code this error corresponds to.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NoProcessorsAvailable(_) => ErrorCode::NoProcessorsAvailable,
            Error::ProcessorNotFound(_) => ErrorCode::ProcessorNotFound,
            Error::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            Error::BatchBufferBusy(_) => ErrorCode::BatchBufferBusy,
            Error::MigrationCooldown(_) => ErrorCode::MigrationCooldown,
            Error::MigrationInProgress(_) => ErrorCode::MigrationInProgress,
            Error::HealthCheckTimeout(_) => ErrorCode::HealthCheckTimeout,
            Error::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            Error::IndexInconsistency { .. } => ErrorCode::IndexInconsistency,
            Error::Validation(_) => ErrorCode::InvalidConfiguration,
        }
    }

    /// Whether a caller may reasonably retry this operation unchanged.
    ///
    /// Busy/cooldown conditions clear on their own; everything else needs
    /// the caller (or an operator) to do something first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::BatchBufferBusy(_) | Error::MigrationCooldown(_) | Error::HealthCheckTimeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_variant() {
        let e = Error::ProcessorNotFound("p1".into());
        assert_eq!(e.code(), ErrorCode::ProcessorNotFound);
        assert_eq!(e.code().as_str(), "ProcessorNotFound");
    }

    #[test]
    fn retryable_classification() {
        assert!(Error::BatchBufferBusy("p1".into()).is_retryable());
        assert!(!Error::ProcessorNotFound("p1".into()).is_retryable());
        assert!(!Error::CapacityExceeded {
            processor_id: "p1".into(),
            detail: "full".into()
        }
        .is_retryable());
    }
}

//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A record's identity within a single processor.
///
/// Caller-supplied or generated by the producer; unique only within the
/// owning processor, never globally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        RecordId(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

/// A processor's identity within the registry.
///
/// Fresh ids are minted on registration and on auto-replacement; a
/// replacement processor never reuses its predecessor's id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessorId(String);

impl ProcessorId {
    /// Wrap an existing id string (e.g. a caller-supplied, human-readable id).
    pub fn new(id: impl Into<String>) -> Self {
        ProcessorId(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        ProcessorId(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessorId {
    fn from(s: &str) -> Self {
        ProcessorId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = ProcessorId::generate();
        let b = ProcessorId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn display_matches_inner_string() {
        let id = RecordId::new("u1");
        assert_eq!(id.to_string(), "u1");
        assert_eq!(id.as_str(), "u1");
    }
}

//! User domain: accounts, credentials, permissions (`SPEC_FULL.md` §4.4).

use std::sync::Arc;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::error::{Error, Result};
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::processor_meta::{Capabilities, ProcessorMetadata};
use tierdb_core::query::Filter;
use tierdb_core::record::Record;
use tierdb_core::traits::{Processor, RetentionSweeper};

/// Fixed secondary indices the user domain always maintains: `email`
/// (enforced unique by [`UserProcessor`]), `token -> userId`, and
/// `permission -> set<userId>` (a user's `permission` field may be a JSON
/// array, indexed element-wise by [`crate::processor_base::ProcessorBase`]).
pub fn user_indexed_fields() -> Vec<String> {
    vec!["email".to_string(), "token".to_string(), "permission".to_string()]
}

/// Reject a user record with a missing/non-empty-string `id`, a missing
/// `email`, or an `email` that doesn't look like `local@domain.tld`.
pub fn validate_user_payload(record: &Record) -> Result<()> {
    if record.id.is_empty() {
        return Err(Error::Validation("user record must have a non-empty userId".into()));
    }
    match record.data.get("email") {
        Some(serde_json::Value::String(s)) if is_valid_email(s) => Ok(()),
        Some(serde_json::Value::String(_)) => Err(Error::Validation("user record field `email` is not a valid email address".into())),
        Some(_) => Err(Error::Validation("user record field `email` must be a string".into())),
        None => Err(Error::Validation("user record missing required field `email`".into())),
    }
}

/// A deliberately lightweight check: exactly one `@`, a non-empty local
/// part, and a domain part containing at least one `.` with non-empty
/// labels on both sides. Good enough to catch payload typos, not a full
/// RFC 5322 validator.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    domain.contains('.') && !domain.contains('@')
}

/// Wraps a user-domain processor (hot or cold) to enforce email uniqueness
/// at store time, something no per-record validation function can check on
/// its own (`SPEC_FULL.md` §4.4: `email (unique)`).
pub struct UserProcessor {
    inner: Arc<dyn Processor>,
}

impl UserProcessor {
    pub fn new(inner: Arc<dyn Processor>) -> Self {
        UserProcessor { inner }
    }
}

impl Processor for UserProcessor {
    fn store(&self, record: Record) -> Result<()> {
        if let Some(email) = record.data.get("email").and_then(|v| v.as_str()) {
            let clashing = self
                .inner
                .query(&[Filter::Eq {
                    field: "email".to_string(),
                    value: serde_json::json!(email),
                }])?
                .into_iter()
                .any(|r| r.id != record.id);
            if clashing {
                return Err(Error::Validation(format!("email `{email}` is already registered to another user")));
            }
        }
        self.inner.store(record)
    }

    fn retrieve(&self, id: &str) -> Result<Option<Record>> {
        self.inner.retrieve(id)
    }

    fn query(&self, filters: &[Filter]) -> Result<Vec<Record>> {
        self.inner.query(filters)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }

    fn get_health(&self) -> HealthReport {
        self.inner.get_health()
    }

    fn get_metrics(&self) -> ProcessorMetrics {
        self.inner.get_metrics()
    }

    fn get_metadata(&self) -> ProcessorMetadata {
        self.inner.get_metadata()
    }

    fn get_capabilities(&self) -> Capabilities {
        self.inner.get_capabilities()
    }

    fn get_configuration(&self) -> ProcessorConfig {
        self.inner.get_configuration()
    }

    fn shutdown(&self) -> Result<()> {
        self.inner.shutdown()
    }

    fn as_retention_sweeper(&self) -> Option<&dyn RetentionSweeper> {
        self.inner.as_retention_sweeper()
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tierdb_core::config::ProcessorConfig;
    use tierdb_core::domain::Domain;

    #[test]
    fn rejects_missing_email() {
        let record = Record::new("u1", Domain::User, 0, json!({"status": "active"}));
        assert!(validate_user_payload(&record).is_err());
    }

    #[test]
    fn accepts_record_with_valid_email() {
        let record = Record::new("u1", Domain::User, 0, json!({"email": "a@example.com"}));
        assert!(validate_user_payload(&record).is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        let record = Record::new("u1", Domain::User, 0, json!({"email": "not-an-email"}));
        assert!(validate_user_payload(&record).is_err());
    }

    #[test]
    fn rejects_empty_user_id() {
        let record = Record::new("", Domain::User, 0, json!({"email": "a@example.com"}));
        assert!(validate_user_payload(&record).is_err());
    }

    fn user_processor() -> UserProcessor {
        use crate::hot::HotProcessor;
        let hot = HotProcessor::new("users", Domain::User, ProcessorConfig::default(), user_indexed_fields(), None);
        UserProcessor::new(Arc::new(hot))
    }

    #[test]
    fn store_rejects_a_second_user_with_the_same_email() {
        let p = user_processor();
        p.store(Record::new("u1", Domain::User, 0, json!({"email": "a@example.com"}))).unwrap();
        let err = p.store(Record::new("u2", Domain::User, 0, json!({"email": "a@example.com"})));
        assert!(err.is_err());
    }

    #[test]
    fn restoring_the_same_user_id_is_not_a_uniqueness_conflict() {
        let p = user_processor();
        p.store(Record::new("u1", Domain::User, 0, json!({"email": "a@example.com"}))).unwrap();
        p.store(Record::new("u1", Domain::User, 0, json!({"email": "a@example.com", "token": "t1"})))
            .unwrap();
    }

    #[test]
    fn token_index_resolves_to_the_owning_user() {
        let p = user_processor();
        p.store(Record::new("u1", Domain::User, 0, json!({"email": "a@example.com", "token": "abc123"})))
            .unwrap();
        let found = p
            .query(&[Filter::Eq {
                field: "token".to_string(),
                value: json!("abc123"),
            }])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");
    }

    #[test]
    fn permission_index_maps_to_every_holder() {
        let p = user_processor();
        p.store(Record::new(
            "u1",
            Domain::User,
            0,
            json!({"email": "a@example.com", "permission": ["admin", "billing"]}),
        ))
        .unwrap();
        p.store(Record::new("u2", Domain::User, 0, json!({"email": "b@example.com", "permission": ["billing"]})))
            .unwrap();

        let admins = p
            .query(&[Filter::Eq {
                field: "permission".to_string(),
                value: json!("admin"),
            }])
            .unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, "u1");

        let billing = p
            .query(&[Filter::Eq {
                field: "permission".to_string(),
                value: json!("billing"),
            }])
            .unwrap();
        assert_eq!(billing.len(), 2);
    }
}

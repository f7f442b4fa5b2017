//! Chat domain: conversations and messages (`SPEC_FULL.md` §4.4).

use std::sync::Arc;
use tierdb_core::config::ProcessorConfig;
use tierdb_core::error::{Error, Result};
use tierdb_core::health::HealthReport;
use tierdb_core::metrics::ProcessorMetrics;
use tierdb_core::processor_meta::{Capabilities, ProcessorMetadata};
use tierdb_core::query::Filter;
use tierdb_core::record::Record;
use tierdb_core::traits::{Processor, RetentionSweeper};

/// Fixed secondary indices the chat domain always maintains. The spec's
/// singular "time-bucket" is resolved the same way as the logs and stats
/// domains: all three granularities, since a conversation's scroll-back
/// view needs day buckets but its "active now" view needs minute ones.
pub fn chat_indexed_fields() -> Vec<String> {
    vec![
        "conversation_id".to_string(),
        "sender_id".to_string(),
        "minute".to_string(),
        "hour".to_string(),
        "day".to_string(),
    ]
}

/// Reject a chat message missing `conversation_id` or `sender_id`.
pub fn validate_chat_payload(record: &Record) -> Result<()> {
    require_non_empty_string(record, "conversation_id")?;
    require_non_empty_string(record, "sender_id")?;
    Ok(())
}

fn require_non_empty_string(record: &Record, field: &str) -> Result<()> {
    match record.data.get(field) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(()),
        _ => Err(Error::Validation(format!("chat record missing required field `{field}`"))),
    }
}

/// Wraps a chat-domain processor (hot or cold) to enforce the one threading
/// invariant that needs store-state, not just the payload itself: a message
/// that replies to another (`reply_to`) must name a message that exists and
/// belongs to the same `conversation_id`.
pub struct ChatProcessor {
    inner: Arc<dyn Processor>,
}

impl ChatProcessor {
    pub fn new(inner: Arc<dyn Processor>) -> Self {
        ChatProcessor { inner }
    }

    fn check_threading(&self, record: &Record) -> Result<()> {
        let Some(reply_to) = record.data.get("reply_to").and_then(|v| v.as_str()) else {
            return Ok(());
        };
        let parent = self
            .inner
            .retrieve(reply_to)?
            .ok_or_else(|| Error::Validation(format!("chat message replies to unknown message `{reply_to}`")))?;
        let parent_conversation = parent.data.get("conversation_id").and_then(|v| v.as_str());
        let conversation = record.data.get("conversation_id").and_then(|v| v.as_str());
        if parent_conversation != conversation {
            return Err(Error::Validation(
                "chat message's `reply_to` target belongs to a different conversation".into(),
            ));
        }
        Ok(())
    }
}

impl Processor for ChatProcessor {
    fn store(&self, record: Record) -> Result<()> {
        self.check_threading(&record)?;
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
    fn rejects_missing_conversation_id() {
        let record = Record::new("m1", Domain::Chat, 0, json!({"sender_id": "u1"}));
        assert!(validate_chat_payload(&record).is_err());
    }

    #[test]
    fn rejects_missing_sender_id() {
        let record = Record::new("m1", Domain::Chat, 0, json!({"conversation_id": "c1"}));
        assert!(validate_chat_payload(&record).is_err());
    }

    #[test]
    fn accepts_record_with_conversation_and_sender() {
        let record = Record::new("m1", Domain::Chat, 0, json!({"conversation_id": "c1", "sender_id": "u1"}));
        assert!(validate_chat_payload(&record).is_ok());
    }

    fn chat_processor() -> ChatProcessor {
        use crate::hot::HotProcessor;
        let hot = HotProcessor::new("chat1", Domain::Chat, ProcessorConfig::default(), chat_indexed_fields(), None);
        ChatProcessor::new(Arc::new(hot))
    }

    #[test]
    fn reply_in_the_same_conversation_is_accepted() {
        let p = chat_processor();
        p.store(Record::new("m1", Domain::Chat, 0, json!({"conversation_id": "c1", "sender_id": "u1"})))
            .unwrap();
        p.store(Record::new(
            "m2",
            Domain::Chat,
            0,
            json!({"conversation_id": "c1", "sender_id": "u2", "reply_to": "m1"}),
        ))
        .unwrap();
    }

    #[test]
    fn reply_to_a_different_conversation_is_rejected() {
        let p = chat_processor();
        p.store(Record::new("m1", Domain::Chat, 0, json!({"conversation_id": "c1", "sender_id": "u1"})))
            .unwrap();
        let err = p.store(Record::new(
            "m2",
            Domain::Chat,
            0,
            json!({"conversation_id": "c2", "sender_id": "u2", "reply_to": "m1"}),
        ));
        assert!(err.is_err());
    }

    #[test]
    fn reply_to_an_unknown_message_is_rejected() {
        let p = chat_processor();
        let err = p.store(Record::new(
            "m2",
            Domain::Chat,
            0,
            json!({"conversation_id": "c1", "sender_id": "u2", "reply_to": "nope"}),
        ));
        assert!(err.is_err());
    }

    #[test]
    fn indexed_fields_include_conversation_sender_and_time_buckets() {
        let fields = chat_indexed_fields();
        for expected in ["conversation_id", "sender_id", "minute", "hour", "day"] {
            assert!(fields.contains(&expected.to_string()), "missing index `{expected}`");
        }
    }
}

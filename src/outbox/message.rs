use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of a domain event, written in the same transaction as the
/// aggregate change it describes and drained later by a relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Equals the domain event id, so re-appending one event collides on the
    /// primary key.
    pub id: String,
    pub tenant_id: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub dedup_key: String,
    /// JSON-encoded event.
    pub payload: String,
    pub occurred_at: DateTime<Utc>,
    /// Set by the relay. The core never writes it.
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Deduplication key: `aggregate_id::event_type`.
    pub fn dedup_key(aggregate_id: &str, event_type: &str) -> String {
        format!("{}::{}", aggregate_id, event_type)
    }

    /// Whether the relay has published it.
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Decode the payload back into a typed event.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

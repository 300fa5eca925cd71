use tracing::{debug, warn};

use super::{DomainEvent, OutboxMessage, OutboxStore};
use crate::error::CommandError;

/// Records domain events in the caller's transaction. Never publishes; the
/// only promise is that if the aggregate write commits, the event row commits
/// with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboxAppender;

impl OutboxAppender {
    /// Create an appender.
    pub fn new() -> Self {
        OutboxAppender
    }

    /// Serialize `event` and insert it into the outbox in `tx`.
    pub fn append<T, E>(
        &self,
        tx: &mut T,
        tenant_id: &str,
        aggregate_id: &str,
        event: &E,
    ) -> Result<OutboxMessage, CommandError>
    where
        T: OutboxStore + ?Sized,
        E: DomainEvent,
    {
        let event_type = event.event_type().to_string();
        let payload = serde_json::to_string(event).map_err(|err| {
            warn!(%aggregate_id, %event_type, error = %err, "outbox event serialization failed");
            CommandError::Serialization(err.to_string())
        })?;

        let message = OutboxMessage {
            id: event.event_id().to_string(),
            tenant_id: tenant_id.to_string(),
            aggregate_id: aggregate_id.to_string(),
            dedup_key: OutboxMessage::dedup_key(aggregate_id, &event_type),
            event_type,
            payload,
            occurred_at: event.occurred_at(),
            published_at: None,
        };

        tx.insert_outbox(&message)?;
        debug!(
            id = %message.id,
            aggregate_id = %message.aggregate_id,
            event_type = %message.event_type,
            "outbox message appended"
        );
        Ok(message)
    }
}

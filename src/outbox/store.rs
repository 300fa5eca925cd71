use super::OutboxMessage;
use crate::store::StoreError;

pub const OUTBOX_TABLE: &str = "outbox_messages";

/// Append-only outbox persistence. Unique on `id` and on `dedup_key`.
pub trait OutboxStore {
    fn insert_outbox(&mut self, message: &OutboxMessage) -> Result<(), StoreError>;
}

mod appender;
mod event;
mod message;
mod store;

// Event contract and the events this crate emits
pub use event::{DomainEvent, WorkRecordApproved};

// Durable row
pub use message::OutboxMessage;

// Storage port
pub use store::{OutboxStore, OUTBOX_TABLE};

// Transactional append
pub use appender::OutboxAppender;

//! Storage ports and the in-memory reference store.
//!
//! Every command runs against one `Transaction`: the union of the narrow
//! ports each component needs. The core never begins, commits or rolls back;
//! whoever hands it the transaction owns that boundary.

mod error;
mod in_memory;

use crate::directory::DirectoryStore;
use crate::idempotency::IdempotencyStore;
use crate::outbox::OutboxStore;
use crate::work_record::WorkRecordStore;

pub use error::StoreError;
pub use in_memory::{InMemoryStore, InMemoryTransaction};

/// Everything one command may read or write.
pub trait Transaction: WorkRecordStore + DirectoryStore + IdempotencyStore + OutboxStore {}

// Blanket implementation: anything implementing all ports is a Transaction
impl<T> Transaction for T where
    T: WorkRecordStore + DirectoryStore + IdempotencyStore + OutboxStore + ?Sized
{
}

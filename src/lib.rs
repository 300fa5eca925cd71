//! Command core for tenant-scoped billable work records.
//!
//! Records move `Draft -> Submitted -> Approved`. Every command runs inside
//! one caller-owned [`Transaction`], gated by role and ownership policy,
//! optionally guarded by an idempotency key, and approval stages a
//! `work_record.approved` event in the transactional outbox.

pub mod actor;
pub mod clock;
pub mod config;
pub mod directory;
mod error;
pub mod idempotency;
pub mod outbox;
pub mod policy;
mod service;
pub mod store;
pub mod work_record;

pub use actor::{ActorResolver, CurrentActor, Role, SessionActorResolver, StaticActorResolver};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigError};
pub use directory::{Customer, DirectoryStore, Project};
pub use error::CommandError;
pub use idempotency::{IdempotencyCache, IdempotencyRecord, IdempotencyStore, Operation};
pub use outbox::{DomainEvent, OutboxAppender, OutboxMessage, OutboxStore, WorkRecordApproved};
pub use service::{CreateWorkRecord, Patch, UpdateWorkRecord, WorkRecordService};
pub use store::{InMemoryStore, InMemoryTransaction, StoreError, Transaction};
pub use work_record::{Lifecycle, Status, WorkDetails, WorkRecord, WorkRecordStore};

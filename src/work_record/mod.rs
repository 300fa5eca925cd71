//! Work record aggregate: a tenant-owned unit of billable work moving through
//! `Draft -> Submitted -> Approved`.

mod record;
mod store;

pub use record::{
    Lifecycle, Status, WorkDetails, WorkRecord, MAX_DURATION_MINUTES, MAX_NARRATIVE_CHARS,
    MIN_DURATION_MINUTES,
};
pub use store::{WorkRecordStore, WORK_RECORDS_TABLE};

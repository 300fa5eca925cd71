use super::{Status, WorkRecord};
use crate::store::StoreError;

pub const WORK_RECORDS_TABLE: &str = "work_records";

/// Tenant-scoped persistence of work record snapshots.
pub trait WorkRecordStore {
    /// Load a record. A record owned by another tenant is reported as absent.
    fn find_record(&self, tenant_id: &str, id: &str) -> Result<Option<WorkRecord>, StoreError>;

    /// Insert a newly drafted record. Fails if the id is taken.
    fn insert_record(&mut self, record: &WorkRecord) -> Result<(), StoreError>;

    /// Replace a stored snapshot, provided the persisted status still equals
    /// `expected`. A mismatch is a `StoreError::Conflict`.
    fn update_record(&mut self, record: &WorkRecord, expected: Status) -> Result<(), StoreError>;
}

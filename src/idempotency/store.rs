use super::{IdempotencyRecord, Operation};
use crate::store::StoreError;

pub const IDEMPOTENCY_TABLE: &str = "idempotency_records";

/// Persistence of replay entries.
///
/// Implementations must enforce uniqueness on `(operation, actor_id, key_hash)`
/// among live rows: inserting over a row whose `expires_at` is at or before the
/// new row's `created_at` replaces it, inserting over a live row fails with
/// `StoreError::UniqueViolation`.
pub trait IdempotencyStore {
    /// Raw lookup. Expired rows are returned too; callers filter on expiry.
    fn find_idempotency(
        &self,
        operation: Operation,
        actor_id: &str,
        key_hash: &str,
    ) -> Result<Option<IdempotencyRecord>, StoreError>;

    fn insert_idempotency(&mut self, record: &IdempotencyRecord) -> Result<(), StoreError>;
}

//! InMemoryStore - RwLock-backed store with staged, all-or-nothing commits.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::StoreError;
use crate::directory::{Customer, DirectoryStore, Project, CUSTOMERS_TABLE, PROJECTS_TABLE};
use crate::idempotency::{
    unique_key, IdempotencyRecord, IdempotencyStore, Operation, IDEMPOTENCY_TABLE,
};
use crate::outbox::{OutboxMessage, OutboxStore, OUTBOX_TABLE};
use crate::work_record::{Status, WorkRecord, WorkRecordStore, WORK_RECORDS_TABLE};

#[derive(Default)]
struct Tables {
    /// JSON-encoded snapshots keyed by `"work_records:id"`.
    records: HashMap<String, Vec<u8>>,
    customers: HashMap<String, Customer>,
    projects: HashMap<String, Project>,
    /// Keyed by the `(operation, actor, hash)` uniqueness key.
    idempotency: HashMap<String, IdempotencyRecord>,
    /// Insertion-ordered.
    outbox: Vec<OutboxMessage>,
}

impl Tables {
    fn record_status(&self, key: &str) -> Result<Option<Status>, StoreError> {
        match self.records.get(key) {
            Some(bytes) => Ok(Some(decode_record(bytes)?.status())),
            None => Ok(None),
        }
    }

    fn outbox_conflict(&self, message: &OutboxMessage) -> bool {
        self.outbox
            .iter()
            .any(|m| m.id == message.id || m.dedup_key == message.dedup_key)
    }
}

fn record_key(id: &str) -> String {
    format!("{}:{}", WORK_RECORDS_TABLE, id)
}

fn decode_record(bytes: &[u8]) -> Result<WorkRecord, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// A live row blocks a new one with the same key; an expired row is replaced.
fn blocks(existing: &IdempotencyRecord, incoming: &IdempotencyRecord) -> bool {
    existing.is_live(incoming.created_at)
}

/// In-memory store. Clone-friendly via Arc; clones share storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction. Nothing it writes is visible to others until
    /// `commit`; dropping it discards every staged write.
    pub fn begin(&self) -> InMemoryTransaction<'_> {
        InMemoryTransaction {
            store: self,
            writes: Vec::new(),
            records: HashMap::new(),
            idempotency: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    /// Run `f` in a fresh transaction, committing on `Ok` and rolling back on
    /// `Err`.
    pub fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut InMemoryTransaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut tx = self.begin();
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Seed a customer.
    pub fn add_customer(&self, customer: Customer) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("customers write"))?;
        if tables.customers.contains_key(&customer.id) {
            return Err(StoreError::UniqueViolation {
                table: CUSTOMERS_TABLE,
                key: customer.id,
            });
        }
        tables.customers.insert(customer.id.clone(), customer);
        Ok(())
    }

    /// Seed a project.
    pub fn add_project(&self, project: Project) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("projects write"))?;
        if tables.projects.contains_key(&project.id) {
            return Err(StoreError::UniqueViolation {
                table: PROJECTS_TABLE,
                key: project.id,
            });
        }
        tables.projects.insert(project.id.clone(), project);
        Ok(())
    }

    /// Committed snapshot of a record, regardless of tenant.
    pub fn record(&self, id: &str) -> Result<Option<WorkRecord>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        tables
            .records
            .get(&record_key(id))
            .map(|bytes| decode_record(bytes))
            .transpose()
    }

    /// All outbox messages, oldest first.
    pub fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("outbox read"))?;
        Ok(tables.outbox.clone())
    }

    /// Messages the relay has not picked up yet, oldest first.
    pub fn unpublished_outbox(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("outbox read"))?;
        Ok(tables
            .outbox
            .iter()
            .filter(|m| !m.is_published())
            .cloned()
            .collect())
    }

    /// The relay's side of the table: stamp messages as published.
    pub fn mark_published(&self, ids: &[&str], at: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("outbox write"))?;
        let mut marked = 0;
        for message in tables.outbox.iter_mut() {
            if message.published_at.is_none() && ids.contains(&message.id.as_str()) {
                message.published_at = Some(at);
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// All stored replay entries.
    pub fn idempotency_records(&self) -> Result<Vec<IdempotencyRecord>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("idempotency read"))?;
        Ok(tables.idempotency.values().cloned().collect())
    }

    /// Delete replay entries that expired at or before `now`. Expiry is already
    /// enforced at lookup; this only reclaims space.
    pub fn purge_expired_idempotency(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("idempotency write"))?;
        let before = tables.idempotency.len();
        tables.idempotency.retain(|_, record| record.is_live(now));
        Ok(before - tables.idempotency.len())
    }
}

enum Write {
    InsertRecord {
        key: String,
        status: Status,
        bytes: Vec<u8>,
    },
    UpdateRecord {
        key: String,
        id: String,
        expected: Status,
        status: Status,
        bytes: Vec<u8>,
    },
    InsertIdempotency(IdempotencyRecord),
    InsertOutbox(OutboxMessage),
}

/// A unit of work against an [`InMemoryStore`].
///
/// Writes are staged and visible to this transaction's own reads. Constraints
/// are checked when staging (against committed data) and again at `commit`
/// under the store's write lock, so a conflicting commit that landed in between
/// is caught and nothing is applied.
pub struct InMemoryTransaction<'a> {
    store: &'a InMemoryStore,
    writes: Vec<Write>,
    records: HashMap<String, WorkRecord>,
    idempotency: HashMap<String, IdempotencyRecord>,
    outbox: Vec<OutboxMessage>,
}

impl InMemoryTransaction<'_> {
    fn committed_record(&self, key: &str) -> Result<Option<WorkRecord>, StoreError> {
        let tables = self
            .store
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        tables
            .records
            .get(key)
            .map(|bytes| decode_record(bytes))
            .transpose()
    }

    fn current_record(&self, id: &str) -> Result<Option<WorkRecord>, StoreError> {
        match self.records.get(id) {
            Some(record) => Ok(Some(record.clone())),
            None => self.committed_record(&record_key(id)),
        }
    }

    /// Apply every staged write atomically, or none of them.
    pub fn commit(mut self) -> Result<(), StoreError> {
        let writes = mem::take(&mut self.writes);
        if writes.is_empty() {
            return Ok(());
        }

        let mut tables = self
            .store
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("commit"))?;

        let mut statuses: HashMap<&str, Status> = HashMap::new();
        let mut idempotency_keys: HashSet<String> = HashSet::new();
        let mut outbox_keys: HashSet<&str> = HashSet::new();

        for write in &writes {
            match write {
                Write::InsertRecord { key, status, .. } => {
                    if statuses.contains_key(key.as_str()) || tables.records.contains_key(key) {
                        return Err(StoreError::UniqueViolation {
                            table: WORK_RECORDS_TABLE,
                            key: key.clone(),
                        });
                    }
                    statuses.insert(key, *status);
                }
                Write::UpdateRecord {
                    key,
                    id,
                    expected,
                    status,
                    ..
                } => {
                    let actual = match statuses.get(key.as_str()) {
                        Some(status) => Some(*status),
                        None => tables.record_status(key)?,
                    };
                    let actual = actual.ok_or_else(|| StoreError::NotFound {
                        table: WORK_RECORDS_TABLE,
                        id: id.clone(),
                    })?;
                    if actual != *expected {
                        return Err(StoreError::Conflict {
                            table: WORK_RECORDS_TABLE,
                            id: id.clone(),
                            expected: expected.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                    statuses.insert(key, *status);
                }
                Write::InsertIdempotency(record) => {
                    let key = record.unique_key();
                    let taken = idempotency_keys.contains(&key)
                        || tables
                            .idempotency
                            .get(&key)
                            .map(|existing| blocks(existing, record))
                            .unwrap_or(false);
                    if taken {
                        return Err(StoreError::UniqueViolation {
                            table: IDEMPOTENCY_TABLE,
                            key,
                        });
                    }
                    idempotency_keys.insert(key);
                }
                Write::InsertOutbox(message) => {
                    if outbox_keys.contains(message.id.as_str())
                        || outbox_keys.contains(message.dedup_key.as_str())
                        || tables.outbox_conflict(message)
                    {
                        return Err(StoreError::UniqueViolation {
                            table: OUTBOX_TABLE,
                            key: message.dedup_key.clone(),
                        });
                    }
                    outbox_keys.insert(&message.id);
                    outbox_keys.insert(&message.dedup_key);
                }
            }
        }

        let count = writes.len();
        for write in writes {
            match write {
                Write::InsertRecord { key, bytes, .. } | Write::UpdateRecord { key, bytes, .. } => {
                    tables.records.insert(key, bytes);
                }
                Write::InsertIdempotency(record) => {
                    tables.idempotency.insert(record.unique_key(), record);
                }
                Write::InsertOutbox(message) => {
                    tables.outbox.push(message);
                }
            }
        }

        debug!(writes = count, "transaction committed");
        Ok(())
    }
}

impl Drop for InMemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.writes.is_empty() {
            debug!(writes = self.writes.len(), "transaction rolled back");
        }
    }
}

impl WorkRecordStore for InMemoryTransaction<'_> {
    fn find_record(&self, tenant_id: &str, id: &str) -> Result<Option<WorkRecord>, StoreError> {
        Ok(self
            .current_record(id)?
            .filter(|record| record.tenant_id() == tenant_id))
    }

    fn insert_record(&mut self, record: &WorkRecord) -> Result<(), StoreError> {
        if self.current_record(record.id())?.is_some() {
            return Err(StoreError::UniqueViolation {
                table: WORK_RECORDS_TABLE,
                key: record.id().to_string(),
            });
        }
        self.writes.push(Write::InsertRecord {
            key: record_key(record.id()),
            status: record.status(),
            bytes: serde_json::to_vec(record)?,
        });
        self.records.insert(record.id().to_string(), record.clone());
        Ok(())
    }

    fn update_record(&mut self, record: &WorkRecord, expected: Status) -> Result<(), StoreError> {
        let current = self
            .current_record(record.id())?
            .ok_or_else(|| StoreError::NotFound {
                table: WORK_RECORDS_TABLE,
                id: record.id().to_string(),
            })?;
        if current.status() != expected {
            return Err(StoreError::Conflict {
                table: WORK_RECORDS_TABLE,
                id: record.id().to_string(),
                expected: expected.to_string(),
                actual: current.status().to_string(),
            });
        }
        self.writes.push(Write::UpdateRecord {
            key: record_key(record.id()),
            id: record.id().to_string(),
            expected,
            status: record.status(),
            bytes: serde_json::to_vec(record)?,
        });
        self.records.insert(record.id().to_string(), record.clone());
        Ok(())
    }
}

impl DirectoryStore for InMemoryTransaction<'_> {
    fn find_customer(&self, tenant_id: &str, id: &str) -> Result<Option<Customer>, StoreError> {
        let tables = self
            .store
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("customers read"))?;
        Ok(tables
            .customers
            .get(id)
            .filter(|customer| customer.tenant_id == tenant_id)
            .cloned())
    }

    fn find_project(&self, tenant_id: &str, id: &str) -> Result<Option<Project>, StoreError> {
        let tables = self
            .store
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("projects read"))?;
        Ok(tables
            .projects
            .get(id)
            .filter(|project| project.tenant_id == tenant_id)
            .cloned())
    }
}

impl IdempotencyStore for InMemoryTransaction<'_> {
    fn find_idempotency(
        &self,
        operation: Operation,
        actor_id: &str,
        key_hash: &str,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        let key = unique_key(operation, actor_id, key_hash);
        if let Some(staged) = self.idempotency.get(&key) {
            return Ok(Some(staged.clone()));
        }
        let tables = self
            .store
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("idempotency read"))?;
        Ok(tables.idempotency.get(&key).cloned())
    }

    fn insert_idempotency(&mut self, record: &IdempotencyRecord) -> Result<(), StoreError> {
        let key = record.unique_key();
        let taken = match self.idempotency.get(&key) {
            Some(staged) => blocks(staged, record),
            None => {
                let tables = self
                    .store
                    .tables
                    .read()
                    .map_err(|_| StoreError::LockPoisoned("idempotency read"))?;
                tables
                    .idempotency
                    .get(&key)
                    .map(|existing| blocks(existing, record))
                    .unwrap_or(false)
            }
        };
        if taken {
            return Err(StoreError::UniqueViolation {
                table: IDEMPOTENCY_TABLE,
                key,
            });
        }
        self.writes.push(Write::InsertIdempotency(record.clone()));
        self.idempotency.insert(key, record.clone());
        Ok(())
    }
}

impl OutboxStore for InMemoryTransaction<'_> {
    fn insert_outbox(&mut self, message: &OutboxMessage) -> Result<(), StoreError> {
        let staged = self
            .outbox
            .iter()
            .any(|m| m.id == message.id || m.dedup_key == message.dedup_key);
        let committed = {
            let tables = self
                .store
                .tables
                .read()
                .map_err(|_| StoreError::LockPoisoned("outbox read"))?;
            tables.outbox_conflict(message)
        };
        if staged || committed {
            return Err(StoreError::UniqueViolation {
                table: OUTBOX_TABLE,
                key: message.dedup_key.clone(),
            });
        }
        self.writes.push(Write::InsertOutbox(message.clone()));
        self.outbox.push(message.clone());
        Ok(())
    }
}

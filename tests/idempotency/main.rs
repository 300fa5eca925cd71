//! Idempotency keys on create and approve: replay, isolation, expiry and
//! racing duplicates.

#[path = "../support/mod.rs"]
mod support;

use std::cell::Cell;

use chrono::Duration;
use support::{alice, audit_work, bob, maria, Harness};
use worklog_core::idempotency::hash_key;
use worklog_core::{
    CommandError, Customer, DirectoryStore, IdempotencyRecord, IdempotencyStore,
    InMemoryTransaction, Operation, OutboxMessage, OutboxStore, Project, Status, StoreError,
    WorkRecord, WorkRecordStore,
};

#[test]
fn repeated_create_replays_the_first_id() {
    let h = Harness::new();
    let first = h.create(&alice(), audit_work(30), Some("create-1")).unwrap();
    h.advance(Duration::hours(1));
    let second = h.create(&alice(), audit_work(30), Some("create-1")).unwrap();

    assert_eq!(first, second);
    assert_eq!(h.store.idempotency_records().unwrap().len(), 1);
}

#[test]
fn key_is_trimmed_before_hashing() {
    let h = Harness::new();
    let first = h.create(&alice(), audit_work(30), Some("create-1")).unwrap();
    let second = h.create(&alice(), audit_work(30), Some("  create-1\n")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn only_the_digest_is_stored() {
    let h = Harness::new();
    let id = h.create(&alice(), audit_work(30), Some("secret-key")).unwrap();

    let rows = h.store.idempotency_records().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.key_hash, hash_key("secret-key"));
    assert_ne!(row.key_hash, "secret-key");
    assert_eq!(row.operation, Operation::CreateWorkRecord);
    assert_eq!(row.actor_id, "alice");
    assert_eq!(row.response_id, id);
    assert_eq!(row.expires_at - row.created_at, Duration::hours(24));
}

#[test]
fn blank_keys_are_not_cached() {
    let h = Harness::new();
    let a = h.create(&alice(), audit_work(30), None).unwrap();
    let b = h.create(&alice(), audit_work(30), Some("   ")).unwrap();
    let c = h.create(&alice(), audit_work(30), Some("")).unwrap();

    assert_ne!(a, b);
    assert_ne!(b, c);
    assert!(h.store.idempotency_records().unwrap().is_empty());
}

#[test]
fn keys_are_isolated_per_actor() {
    let h = Harness::new();
    let mine = h.create(&alice(), audit_work(30), Some("shared")).unwrap();
    let theirs = h.create(&bob(), audit_work(30), Some("shared")).unwrap();

    assert_ne!(mine, theirs);
    assert_eq!(h.get(&bob(), &theirs).unwrap().owner_id(), "bob");
}

#[test]
fn keys_are_isolated_per_operation() {
    let h = Harness::new();
    let submitted = h.submitted_by(&alice());
    let created = h.create(&maria(), audit_work(30), Some("shared")).unwrap();

    let approved = h.approve(&maria(), &submitted, Some("shared")).unwrap();

    assert_eq!(approved, submitted);
    assert_ne!(approved, created);
    assert_eq!(h.get(&maria(), &submitted).unwrap().status(), Status::Approved);
}

#[test]
fn expired_keys_execute_again() {
    let h = Harness::new();
    let first = h.create(&alice(), audit_work(30), Some("daily")).unwrap();

    h.advance(Duration::hours(24) - Duration::seconds(1));
    assert_eq!(
        h.create(&alice(), audit_work(30), Some("daily")).unwrap(),
        first
    );

    h.advance(Duration::seconds(1));
    let second = h.create(&alice(), audit_work(30), Some("daily")).unwrap();
    assert_ne!(first, second);

    let rows = h.store.idempotency_records().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].response_id, second);
}

#[test]
fn failed_command_does_not_burn_the_key() {
    let h = Harness::new();
    assert!(h.create(&alice(), audit_work(0), Some("retry-me")).is_err());
    assert!(h.store.idempotency_records().unwrap().is_empty());

    let id = h.create(&alice(), audit_work(15), Some("retry-me")).unwrap();
    assert_eq!(h.get(&alice(), &id).unwrap().duration_minutes(), 15);
}

#[test]
fn double_approval_with_same_key_emits_one_event() {
    let h = Harness::new();
    let id = h.submitted_by(&alice());

    let first = h.approve(&maria(), &id, Some("abc-123")).unwrap();
    let second = h.approve(&maria(), &id, Some("abc-123")).unwrap();

    assert_eq!(first, id);
    assert_eq!(second, id);
    let outbox = h.store.outbox_messages().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].dedup_key, format!("{}::work_record.approved", id));
}

#[test]
fn racing_duplicates_fail_the_late_commit() {
    let h = Harness::new();
    let mut first = h.store.begin();
    let mut second = h.store.begin();

    let a = h
        .service
        .create(&mut first, &alice(), audit_work(30), Some("race"))
        .unwrap();
    let b = h
        .service
        .create(&mut second, &alice(), audit_work(30), Some("race"))
        .unwrap();
    assert_ne!(a, b);

    first.commit().unwrap();
    let err = CommandError::from(second.commit().unwrap_err());

    assert!(matches!(err, CommandError::DuplicateInFlight(_)));
    assert_eq!(err.status_code(), 409);
    assert!(h.store.record(&a).unwrap().is_some());
    assert!(h.store.record(&b).unwrap().is_none());
}

/// Counts reads made through a transaction.
struct CountingTx<'a> {
    inner: InMemoryTransaction<'a>,
    record_reads: Cell<usize>,
    key_reads: Cell<usize>,
}

impl<'a> CountingTx<'a> {
    fn new(inner: InMemoryTransaction<'a>) -> Self {
        Self {
            inner,
            record_reads: Cell::new(0),
            key_reads: Cell::new(0),
        }
    }
}

impl WorkRecordStore for CountingTx<'_> {
    fn find_record(&self, tenant_id: &str, id: &str) -> Result<Option<WorkRecord>, StoreError> {
        self.record_reads.set(self.record_reads.get() + 1);
        self.inner.find_record(tenant_id, id)
    }

    fn insert_record(&mut self, record: &WorkRecord) -> Result<(), StoreError> {
        self.inner.insert_record(record)
    }

    fn update_record(&mut self, record: &WorkRecord, expected: Status) -> Result<(), StoreError> {
        self.inner.update_record(record, expected)
    }
}

impl DirectoryStore for CountingTx<'_> {
    fn find_customer(&self, tenant_id: &str, id: &str) -> Result<Option<Customer>, StoreError> {
        self.inner.find_customer(tenant_id, id)
    }

    fn find_project(&self, tenant_id: &str, id: &str) -> Result<Option<Project>, StoreError> {
        self.inner.find_project(tenant_id, id)
    }
}

impl IdempotencyStore for CountingTx<'_> {
    fn find_idempotency(
        &self,
        operation: Operation,
        actor_id: &str,
        key_hash: &str,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        self.key_reads.set(self.key_reads.get() + 1);
        self.inner.find_idempotency(operation, actor_id, key_hash)
    }

    fn insert_idempotency(&mut self, record: &IdempotencyRecord) -> Result<(), StoreError> {
        self.inner.insert_idempotency(record)
    }
}

impl OutboxStore for CountingTx<'_> {
    fn insert_outbox(&mut self, message: &OutboxMessage) -> Result<(), StoreError> {
        self.inner.insert_outbox(message)
    }
}

#[test]
fn employees_are_refused_before_anything_is_read() {
    let h = Harness::new();
    let id = h.submitted_by(&alice());

    let mut counted = CountingTx::new(h.store.begin());
    let err = h
        .service
        .approve(&mut counted, &alice(), &id, Some("abc-123"))
        .unwrap_err();

    assert!(matches!(err, CommandError::Forbidden(_)));
    assert_eq!(err.status_code(), 403);
    assert_eq!(counted.record_reads.get(), 0);
    assert_eq!(counted.key_reads.get(), 0);
    assert_eq!(h.get(&alice(), &id).unwrap().status(), Status::Submitted);
}

#[test]
fn manager_approval_reads_key_and_record() {
    let h = Harness::new();
    let id = h.submitted_by(&alice());

    let mut counted = CountingTx::new(h.store.begin());
    h.service
        .approve(&mut counted, &maria(), &id, Some("abc-123"))
        .unwrap();

    assert_eq!(counted.key_reads.get(), 1);
    assert_eq!(counted.record_reads.get(), 1);
    counted.inner.commit().unwrap();
    assert_eq!(h.outbox_len(), 1);
}

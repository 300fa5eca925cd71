//! Approval events in the transactional outbox.

#[path = "../support/mod.rs"]
mod support;

use chrono::Duration;
use support::{alice, maria, root, start, Harness, TENANT};
use worklog_core::{CommandError, Status, WorkRecordApproved};

#[test]
fn approval_appends_exactly_one_event() {
    let h = Harness::new();
    let id = h.submitted_by(&alice());
    h.advance(Duration::minutes(30));

    h.approve(&maria(), &id, None).unwrap();

    let outbox = h.store.outbox_messages().unwrap();
    assert_eq!(outbox.len(), 1);
    let message = &outbox[0];
    assert_eq!(message.tenant_id, TENANT);
    assert_eq!(message.aggregate_id, id);
    assert_eq!(message.event_type, WorkRecordApproved::EVENT_TYPE);
    assert_eq!(message.dedup_key, format!("{}::work_record.approved", id));
    assert_eq!(message.occurred_at, start() + Duration::minutes(30));
    assert_eq!(message.published_at, None);

    let event: WorkRecordApproved = message.decode().unwrap();
    assert_eq!(event.event_id, message.id);
    assert_eq!(event.record_id, id);
    assert_eq!(event.owner_id, "alice");
    assert_eq!(event.customer_id, "acme");
    assert_eq!(event.project_id, "audit");
    assert_eq!(event.matter_ref.as_deref(), Some("M-100"));
    assert_eq!(event.duration_minutes, 120);
    assert_eq!(event.approved_by, "maria");
}

#[test]
fn other_transitions_emit_nothing() {
    let h = Harness::new();
    h.submitted_by(&alice());
    assert_eq!(h.outbox_len(), 0);
}

#[test]
fn caller_abort_discards_the_event_with_the_approval() {
    let h = Harness::new();
    let id = h.submitted_by(&alice());

    let result: Result<(), CommandError> = h.store.transact(|tx| {
        h.service.approve(tx, &maria(), &id, None)?;
        Err(CommandError::Validation("caller aborted".into()))
    });

    assert!(result.is_err());
    assert_eq!(h.outbox_len(), 0);
    assert_eq!(h.get(&alice(), &id).unwrap().status(), Status::Submitted);
}

#[test]
fn concurrent_approvals_commit_once() {
    let h = Harness::new();
    let id = h.submitted_by(&alice());

    let mut first = h.store.begin();
    let mut second = h.store.begin();
    h.service.approve(&mut first, &maria(), &id, None).unwrap();
    h.service.approve(&mut second, &root(), &id, None).unwrap();

    first.commit().unwrap();
    let err = CommandError::from(second.commit().unwrap_err());

    assert_eq!(
        err,
        CommandError::InvalidTransition {
            status: Status::Approved,
            action: "change"
        }
    );
    assert_eq!(
        err.to_string(),
        "cannot change a work record in status Approved"
    );
    assert_eq!(h.outbox_len(), 1);
    let record = h.get(&alice(), &id).unwrap();
    assert_eq!(record.approved_by(), Some("maria"));
}

#[test]
fn relay_drains_unpublished_messages() {
    let h = Harness::new();
    let first = h.submitted_by(&alice());
    let second = h.submitted_by(&alice());
    h.approve(&maria(), &first, None).unwrap();
    h.approve(&maria(), &second, None).unwrap();

    let pending = h.store.unpublished_outbox().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].aggregate_id, first);

    let published = h
        .store
        .mark_published(&[pending[0].id.as_str()], start() + Duration::hours(1))
        .unwrap();
    assert_eq!(published, 1);

    let pending = h.store.unpublished_outbox().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].aggregate_id, second);
    assert_eq!(h.outbox_len(), 2);
}

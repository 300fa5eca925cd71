//! Command orchestration for work records.
//!
//! `WorkRecordService` sequences actor, policy, aggregate, idempotency and
//! outbox for each command. It runs inside a transaction the caller owns:
//! every call takes `&mut T: Transaction` and the caller commits when the
//! call returns `Ok`, or drops the transaction otherwise.
//!
//! ```ignore
//! let store = InMemoryStore::new();
//! let service = WorkRecordService::new(SystemClock);
//! let actor = SessionActorResolver::new(session).resolve()?;
//!
//! let id = store.transact(|tx| service.create(tx, &actor, cmd, Some("key-1")))?;
//! store.transact(|tx| service.submit(tx, &actor, &id))?;
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::actor::CurrentActor;
use crate::clock::Clock;
use crate::config::Config;
use crate::directory::resolve_engagement;
use crate::error::CommandError;
use crate::idempotency::{IdempotencyCache, Operation};
use crate::outbox::{OutboxAppender, WorkRecordApproved};
use crate::policy;
use crate::store::Transaction;
use crate::work_record::{Status, WorkDetails, WorkRecord};

/// A field update that tells "leave as is" apart from "clear".
///
/// On the wire an absent field is `Keep`, `null` is `Clear` and any other
/// value is `Set`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Patch<T> {
    /// True when the field was not supplied.
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Resolve against the current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Set(value) => Some(value),
            Patch::Clear => None,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(value) => serializer.serialize_some(value),
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

/// Input for a new draft. The owner and tenant come from the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkRecord {
    pub customer_id: String,
    pub project_id: String,
    #[serde(default)]
    pub matter_ref: Option<String>,
    pub narrative: String,
    pub duration_minutes: u32,
}

impl CreateWorkRecord {
    fn into_details(self) -> WorkDetails {
        WorkDetails {
            customer_id: self.customer_id,
            project_id: self.project_id,
            matter_ref: self.matter_ref,
            narrative: self.narrative,
            duration_minutes: self.duration_minutes,
        }
    }
}

/// Partial update. Unset fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateWorkRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub matter_ref: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl UpdateWorkRecord {
    fn merge(self, current: &WorkDetails) -> WorkDetails {
        WorkDetails {
            customer_id: self
                .customer_id
                .unwrap_or_else(|| current.customer_id.clone()),
            project_id: self
                .project_id
                .unwrap_or_else(|| current.project_id.clone()),
            matter_ref: self.matter_ref.apply(current.matter_ref.clone()),
            narrative: self.narrative.unwrap_or_else(|| current.narrative.clone()),
            duration_minutes: self.duration_minutes.unwrap_or(current.duration_minutes),
        }
    }
}

/// Runs work record commands and queries against a caller-owned transaction.
pub struct WorkRecordService<C> {
    clock: C,
    idempotency: IdempotencyCache<C>,
    outbox: OutboxAppender,
}

impl<C: Clock + Clone> WorkRecordService<C> {
    /// Create a service with the default configuration.
    pub fn new(clock: C) -> Self {
        Self::with_config(clock, &Config::default())
    }

    /// Create a service using `config` for the idempotency window.
    pub fn with_config(clock: C, config: &Config) -> Self {
        Self {
            idempotency: IdempotencyCache::with_ttl(clock.clone(), config.idempotency_ttl()),
            clock,
            outbox: OutboxAppender::new(),
        }
    }

    /// Record new work as a draft owned by the actor. Returns the record id;
    /// a replayed key returns the id of the first execution.
    pub fn create<T>(
        &self,
        tx: &mut T,
        actor: &CurrentActor,
        cmd: CreateWorkRecord,
        idempotency_key: Option<&str>,
    ) -> Result<String, CommandError>
    where
        T: Transaction + ?Sized,
    {
        self.idempotency.execute(
            tx,
            actor,
            idempotency_key,
            Operation::CreateWorkRecord,
            |tx| {
                resolve_engagement(&*tx, &actor.tenant_id, &cmd.customer_id, &cmd.project_id)?;
                let record = WorkRecord::draft(
                    actor.tenant_id.as_str(),
                    actor.user_id.as_str(),
                    cmd.into_details(),
                    self.clock.now(),
                )?;
                tx.insert_record(&record)?;

                info!(
                    id = %record.id(),
                    tenant_id = %record.tenant_id(),
                    owner_id = %record.owner_id(),
                    "work record drafted"
                );
                Ok(record.id().to_string())
            },
        )
    }

    /// Apply a partial update to a record the actor may modify. Returns the
    /// new snapshot.
    pub fn update<T>(
        &self,
        tx: &mut T,
        actor: &CurrentActor,
        id: &str,
        cmd: UpdateWorkRecord,
    ) -> Result<WorkRecord, CommandError>
    where
        T: Transaction + ?Sized,
    {
        let record = load(&*tx, actor, id)?;
        policy::ensure_modify(actor, &record)?;

        let details = cmd.merge(record.details());
        if details.customer_id != record.customer_id() || details.project_id != record.project_id()
        {
            resolve_engagement(
                &*tx,
                &actor.tenant_id,
                &details.customer_id,
                &details.project_id,
            )?;
        }

        let updated = record.update_details(details, self.clock.now())?;
        persist(tx, &updated, record.status(), "update")?;

        info!(id = %updated.id(), actor = %actor.user_id, "work record updated");
        Ok(updated)
    }

    /// Move the actor's own draft to `Submitted`.
    pub fn submit<T>(
        &self,
        tx: &mut T,
        actor: &CurrentActor,
        id: &str,
    ) -> Result<WorkRecord, CommandError>
    where
        T: Transaction + ?Sized,
    {
        let record = load(&*tx, actor, id)?;
        policy::ensure_submit(actor, &record)?;

        let submitted = record.submit(self.clock.now())?;
        persist(tx, &submitted, record.status(), "submit")?;

        info!(id = %submitted.id(), actor = %actor.user_id, "work record submitted");
        Ok(submitted)
    }

    /// Approve a submitted record and stage the `work_record.approved` event
    /// in the same transaction. Employees are turned away before anything is
    /// read.
    pub fn approve<T>(
        &self,
        tx: &mut T,
        actor: &CurrentActor,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<String, CommandError>
    where
        T: Transaction + ?Sized,
    {
        policy::ensure_approver(actor)?;

        self.idempotency.execute(
            tx,
            actor,
            idempotency_key,
            Operation::ApproveWorkRecord,
            |tx| {
                let record = load(&*tx, actor, id)?;
                policy::ensure_approve(actor, &record)?;

                let approved = record.approve(&actor.user_id, self.clock.now())?;
                persist(tx, &approved, record.status(), "approve")?;

                let event = WorkRecordApproved::from_record(&approved).ok_or(
                    CommandError::InvalidTransition {
                        status: approved.status(),
                        action: "approve",
                    },
                )?;
                self.outbox
                    .append(tx, approved.tenant_id(), approved.id(), &event)?;

                info!(
                    id = %approved.id(),
                    approved_by = %actor.user_id,
                    event_id = %event.event_id,
                    "work record approved"
                );
                Ok(approved.id().to_string())
            },
        )
    }

    /// Read one record the actor is allowed to see.
    pub fn get<T>(&self, tx: &T, actor: &CurrentActor, id: &str) -> Result<WorkRecord, CommandError>
    where
        T: Transaction + ?Sized,
    {
        let record = load(tx, actor, id)?;
        policy::ensure_observe(actor, &record)?;
        Ok(record)
    }
}

fn load<T>(tx: &T, actor: &CurrentActor, id: &str) -> Result<WorkRecord, CommandError>
where
    T: Transaction + ?Sized,
{
    tx.find_record(&actor.tenant_id, id)?
        .ok_or_else(|| CommandError::NotFound(id.to_string()))
}

/// Write a transitioned snapshot, reporting a lost status race under the
/// action that was attempted.
fn persist<T>(
    tx: &mut T,
    record: &WorkRecord,
    expected: Status,
    action: &'static str,
) -> Result<(), CommandError>
where
    T: Transaction + ?Sized,
{
    tx.update_record(record, expected)
        .map_err(|err| match CommandError::from(err) {
            CommandError::InvalidTransition { status, .. } => {
                CommandError::InvalidTransition { status, action }
            }
            other => other,
        })
}

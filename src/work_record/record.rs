use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CommandError;

/// Shortest billable entry, in minutes.
pub const MIN_DURATION_MINUTES: u32 = 1;
/// Longest billable entry: one day.
pub const MAX_DURATION_MINUTES: u32 = 1440;
/// Narrative limit, counted in characters.
pub const MAX_NARRATIVE_CHARS: usize = 2048;

/// Lifecycle status of a work record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    Submitted,
    Approved,
}

impl Status {
    /// Stable name, as stored and shown in errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::Submitted => "Submitted",
            Status::Approved => "Approved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Status::Draft),
            "Submitted" => Ok(Status::Submitted),
            "Approved" => Ok(Status::Approved),
            other => Err(format!("unknown work record status: {}", other)),
        }
    }
}

/// Lifecycle state. Approval data only exists on the `Approved` variant, so a
/// non-approved record can never carry an approver or approval time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Lifecycle {
    Draft,
    Submitted,
    Approved {
        approved_by: String,
        approved_at: DateTime<Utc>,
    },
}

impl Lifecycle {
    /// Status this state corresponds to.
    pub fn status(&self) -> Status {
        match self {
            Lifecycle::Draft => Status::Draft,
            Lifecycle::Submitted => Status::Submitted,
            Lifecycle::Approved { .. } => Status::Approved,
        }
    }
}

/// The replaceable part of a work record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDetails {
    pub customer_id: String,
    pub project_id: String,
    pub matter_ref: Option<String>,
    pub narrative: String,
    pub duration_minutes: u32,
}

impl WorkDetails {
    /// Check duration and narrative bounds.
    pub fn validate(&self) -> Result<(), CommandError> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(CommandError::Validation(format!(
                "duration must be between {} and {} minutes, got {}",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, self.duration_minutes
            )));
        }
        if self.narrative.trim().is_empty() {
            return Err(CommandError::Validation("narrative must not be blank".into()));
        }
        let chars = self.narrative.chars().count();
        if chars > MAX_NARRATIVE_CHARS {
            return Err(CommandError::Validation(format!(
                "narrative must be at most {} characters, got {}",
                MAX_NARRATIVE_CHARS, chars
            )));
        }
        Ok(())
    }
}

/// One unit of billable work. Every transition returns a fresh snapshot and
/// leaves `self` untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    id: String,
    tenant_id: String,
    owner_id: String,
    #[serde(flatten)]
    details: WorkDetails,
    #[serde(flatten)]
    lifecycle: Lifecycle,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkRecord {
    /// Start a new record in `Draft`.
    pub fn draft(
        tenant_id: impl Into<String>,
        owner_id: impl Into<String>,
        details: WorkDetails,
        now: DateTime<Utc>,
    ) -> Result<Self, CommandError> {
        details.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            owner_id: owner_id.into(),
            details,
            lifecycle: Lifecycle::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the details. Status gating is the policy's job, not ours.
    pub fn update_details(
        &self,
        details: WorkDetails,
        now: DateTime<Utc>,
    ) -> Result<Self, CommandError> {
        details.validate()?;
        Ok(Self {
            details,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Move a draft to `Submitted`.
    pub fn submit(&self, now: DateTime<Utc>) -> Result<Self, CommandError> {
        match self.lifecycle {
            Lifecycle::Draft => Ok(Self {
                lifecycle: Lifecycle::Submitted,
                updated_at: now,
                ..self.clone()
            }),
            _ => Err(CommandError::InvalidTransition {
                status: self.status(),
                action: "submit",
            }),
        }
    }

    /// Move a submitted record to `Approved`, stamping approver and time.
    pub fn approve(&self, approver_id: &str, now: DateTime<Utc>) -> Result<Self, CommandError> {
        if self.lifecycle != Lifecycle::Submitted {
            return Err(CommandError::InvalidTransition {
                status: self.status(),
                action: "approve",
            });
        }
        if approver_id.trim().is_empty() {
            return Err(CommandError::Validation("approver id is required".into()));
        }
        Ok(Self {
            lifecycle: Lifecycle::Approved {
                approved_by: approver_id.to_string(),
                approved_at: now,
            },
            updated_at: now,
            ..self.clone()
        })
    }

    /// Record id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Owning tenant.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// User who recorded the work.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Whether `user_id` owns this record.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Current details.
    pub fn details(&self) -> &WorkDetails {
        &self.details
    }

    /// Billed customer.
    pub fn customer_id(&self) -> &str {
        &self.details.customer_id
    }

    /// Billed project.
    pub fn project_id(&self) -> &str {
        &self.details.project_id
    }

    /// Optional matter reference.
    pub fn matter_ref(&self) -> Option<&str> {
        self.details.matter_ref.as_deref()
    }

    /// Description of the work.
    pub fn narrative(&self) -> &str {
        &self.details.narrative
    }

    /// Billable minutes.
    pub fn duration_minutes(&self) -> u32 {
        self.details.duration_minutes
    }

    /// Lifecycle state.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.lifecycle.status()
    }

    /// Approver, once approved.
    pub fn approved_by(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Approved { approved_by, .. } => Some(approved_by),
            _ => None,
        }
    }

    /// Approval time, once approved.
    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        match &self.lifecycle {
            Lifecycle::Approved { approved_at, .. } => Some(*approved_at),
            _ => None,
        }
    }

    /// When the record was drafted.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the record last changed.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

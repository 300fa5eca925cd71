use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::work_record::WorkRecord;

/// A fact about an aggregate that external consumers care about.
pub trait DomainEvent: Serialize {
    fn event_id(&self) -> &str;
    fn event_type(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Emitted once when a work record is approved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecordApproved {
    pub event_id: String,
    pub record_id: String,
    pub tenant_id: String,
    pub owner_id: String,
    pub customer_id: String,
    pub project_id: String,
    pub matter_ref: Option<String>,
    pub duration_minutes: u32,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

impl WorkRecordApproved {
    pub const EVENT_TYPE: &'static str = "work_record.approved";

    /// Build the event from an approved snapshot. `None` if the record is not
    /// approved.
    pub fn from_record(record: &WorkRecord) -> Option<Self> {
        Some(Self {
            event_id: Uuid::new_v4().to_string(),
            record_id: record.id().to_string(),
            tenant_id: record.tenant_id().to_string(),
            owner_id: record.owner_id().to_string(),
            customer_id: record.customer_id().to_string(),
            project_id: record.project_id().to_string(),
            matter_ref: record.matter_ref().map(str::to_string),
            duration_minutes: record.duration_minutes(),
            approved_by: record.approved_by()?.to_string(),
            approved_at: record.approved_at()?,
        })
    }
}

impl DomainEvent for WorkRecordApproved {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn event_type(&self) -> &str {
        Self::EVENT_TYPE
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.approved_at
    }
}

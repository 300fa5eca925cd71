//! Shared fixtures: a seeded store, a pinned clock and a cast of actors.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use worklog_core::{
    CommandError, CreateWorkRecord, CurrentActor, Customer, FixedClock, InMemoryStore, Project,
    WorkRecord, WorkRecordService,
};

pub const TENANT: &str = "tenant-a";
pub const OTHER_TENANT: &str = "tenant-b";

pub struct Harness {
    pub store: InMemoryStore,
    pub clock: FixedClock,
    pub service: WorkRecordService<FixedClock>,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

impl Harness {
    /// Tenant A has customers `acme` (project `audit`) and `globex` (project
    /// `migration`). Tenant B has `initech` with project `tps`.
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        seed_customer(&store, TENANT, "acme", &["audit"]);
        seed_customer(&store, TENANT, "globex", &["migration"]);
        seed_customer(&store, OTHER_TENANT, "initech", &["tps"]);

        let clock = FixedClock::new(start());
        let service = WorkRecordService::new(clock.clone());
        Self {
            store,
            clock,
            service,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn create(
        &self,
        actor: &CurrentActor,
        cmd: CreateWorkRecord,
        key: Option<&str>,
    ) -> Result<String, CommandError> {
        self.store
            .transact(|tx| self.service.create(tx, actor, cmd, key))
    }

    pub fn submit(&self, actor: &CurrentActor, id: &str) -> Result<WorkRecord, CommandError> {
        self.store.transact(|tx| self.service.submit(tx, actor, id))
    }

    pub fn approve(
        &self,
        actor: &CurrentActor,
        id: &str,
        key: Option<&str>,
    ) -> Result<String, CommandError> {
        self.store
            .transact(|tx| self.service.approve(tx, actor, id, key))
    }

    pub fn get(&self, actor: &CurrentActor, id: &str) -> Result<WorkRecord, CommandError> {
        let tx = self.store.begin();
        self.service.get(&tx, actor, id)
    }

    /// Draft a record for `owner` and submit it.
    pub fn submitted_by(&self, owner: &CurrentActor) -> String {
        let id = self.create(owner, audit_work(120), None).unwrap();
        self.submit(owner, &id).unwrap();
        id
    }

    pub fn outbox_len(&self) -> usize {
        self.store.outbox_messages().unwrap().len()
    }
}

fn seed_customer(store: &InMemoryStore, tenant: &str, customer: &str, projects: &[&str]) {
    store
        .add_customer(Customer {
            id: customer.into(),
            tenant_id: tenant.into(),
            name: customer.to_uppercase(),
        })
        .unwrap();
    for project in projects {
        store
            .add_project(Project {
                id: (*project).into(),
                tenant_id: tenant.into(),
                customer_id: customer.into(),
                name: project.to_uppercase(),
            })
            .unwrap();
    }
}

pub fn audit_work(duration_minutes: u32) -> CreateWorkRecord {
    CreateWorkRecord {
        customer_id: "acme".into(),
        project_id: "audit".into(),
        matter_ref: Some("M-100".into()),
        narrative: "Reviewed ledger entries".into(),
        duration_minutes,
    }
}

pub fn alice() -> CurrentActor {
    CurrentActor::employee("alice", TENANT)
}

pub fn bob() -> CurrentActor {
    CurrentActor::employee("bob", TENANT)
}

pub fn maria() -> CurrentActor {
    CurrentActor::manager("maria", TENANT)
}

pub fn root() -> CurrentActor {
    CurrentActor::admin("root", TENANT)
}

pub fn outsider() -> CurrentActor {
    CurrentActor::manager("olga", OTHER_TENANT)
}

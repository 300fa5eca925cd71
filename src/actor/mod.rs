//! The authenticated actor behind one command.
//!
//! The actor is resolved once at the edge and then passed explicitly to every
//! service call; nothing in the core reads ambient authentication state.

mod session;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

pub use session::{Session, SessionActorResolver, ROLE_VAR, TENANT_ID_VAR, USER_ID_VAR};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

impl Role {
    /// Lowercase name as carried in sessions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Managers and admins see and act on the whole tenant.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(CommandError::Forbidden(format!("unknown role {}", other))),
        }
    }
}

/// Identity, tenant and role of the caller, valid for one command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentActor {
    pub user_id: String,
    pub tenant_id: String,
    pub role: Role,
}

impl CurrentActor {
    /// Create an actor with an explicit role.
    pub fn new(user_id: impl Into<String>, tenant_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            role,
        }
    }

    /// Create an employee.
    pub fn employee(user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self::new(user_id, tenant_id, Role::Employee)
    }

    /// Create a manager.
    pub fn manager(user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self::new(user_id, tenant_id, Role::Manager)
    }

    /// Create an admin.
    pub fn admin(user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self::new(user_id, tenant_id, Role::Admin)
    }
}

/// Supplies the actor for the command currently being handled.
pub trait ActorResolver {
    fn resolve(&self) -> Result<CurrentActor, CommandError>;
}

/// Always resolves to the same actor.
#[derive(Clone, Debug)]
pub struct StaticActorResolver {
    actor: CurrentActor,
}

impl StaticActorResolver {
    /// Always resolve to `actor`.
    pub fn new(actor: CurrentActor) -> Self {
        Self { actor }
    }
}

impl ActorResolver for StaticActorResolver {
    fn resolve(&self) -> Result<CurrentActor, CommandError> {
        Ok(self.actor.clone())
    }
}

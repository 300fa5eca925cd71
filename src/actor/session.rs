//! Session variables forwarded by the gateway (e.g. Hasura session variables).

use std::collections::HashMap;

use super::{ActorResolver, CurrentActor, Role};
use crate::error::CommandError;

/// Session variable carrying the user id.
pub const USER_ID_VAR: &str = "x-hasura-user-id";
/// Session variable carrying the tenant id.
pub const TENANT_ID_VAR: &str = "x-hasura-tenant-id";
/// Session variable carrying the role name.
pub const ROLE_VAR: &str = "x-hasura-role";

/// Parsed session variables from the incoming request.
///
/// In a Hasura setup these come from the JWT claims the gateway forwards:
///
/// ```json
/// {
///   "x-hasura-user-id": "user-42",
///   "x-hasura-tenant-id": "firm-7",
///   "x-hasura-role": "manager"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    variables: HashMap<String, String>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from raw variables.
    pub fn from_map(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    /// Get the user ID (`x-hasura-user-id`).
    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_VAR)
    }

    /// Get the tenant ID (`x-hasura-tenant-id`).
    pub fn tenant_id(&self) -> Option<&str> {
        self.get(TENANT_ID_VAR)
    }

    /// Get the role (`x-hasura-role`).
    pub fn role(&self) -> Option<&str> {
        self.get(ROLE_VAR)
    }

    /// Get a session variable by key. Blank values count as missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Set a session variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }
}

/// Resolves the actor from a request's session variables.
#[derive(Debug, Clone)]
pub struct SessionActorResolver {
    session: Session,
}

impl SessionActorResolver {
    /// Create a resolver over `session`.
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl ActorResolver for SessionActorResolver {
    fn resolve(&self) -> Result<CurrentActor, CommandError> {
        let user_id = self
            .session
            .user_id()
            .ok_or_else(|| CommandError::Unauthenticated("missing user ID in session".into()))?;
        let tenant_id = self
            .session
            .tenant_id()
            .ok_or_else(|| CommandError::Unauthenticated("missing tenant ID in session".into()))?;
        let role: Role = self
            .session
            .role()
            .ok_or_else(|| CommandError::Unauthenticated("missing role in session".into()))?
            .parse()?;

        Ok(CurrentActor::new(user_id, tenant_id, role))
    }
}

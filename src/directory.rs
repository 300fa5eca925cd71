//! Customer and project lookups owned by the roster service.
//!
//! The core only reads these; creating and editing them happens elsewhere.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::store::StoreError;

/// Table names, as reported in storage errors.
pub const CUSTOMERS_TABLE: &str = "customers";
pub const PROJECTS_TABLE: &str = "projects";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub tenant_id: String,
    pub customer_id: String,
    pub name: String,
}

/// Tenant-scoped reads of customers and projects.
pub trait DirectoryStore {
    fn find_customer(&self, tenant_id: &str, id: &str) -> Result<Option<Customer>, StoreError>;
    fn find_project(&self, tenant_id: &str, id: &str) -> Result<Option<Project>, StoreError>;
}

/// Resolve a customer/project pair inside one tenant and check that the
/// project is billed to that customer.
pub fn resolve_engagement<D: DirectoryStore + ?Sized>(
    directory: &D,
    tenant_id: &str,
    customer_id: &str,
    project_id: &str,
) -> Result<(Customer, Project), CommandError> {
    let customer = directory
        .find_customer(tenant_id, customer_id)?
        .ok_or_else(|| CommandError::Validation(format!("unknown customer {}", customer_id)))?;
    let project = directory
        .find_project(tenant_id, project_id)?
        .ok_or_else(|| CommandError::Validation(format!("unknown project {}", project_id)))?;

    if project.customer_id != customer.id {
        return Err(CommandError::Validation(
            "project does not belong to customer".into(),
        ));
    }

    Ok((customer, project))
}

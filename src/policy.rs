//! Authorization decisions over (actor, work record). Pure; no storage access.

use crate::actor::{CurrentActor, Role};
use crate::error::CommandError;
use crate::work_record::{Status, WorkRecord};

/// Records are only ever visible inside their own tenant. A foreign record is
/// reported as missing so its existence does not leak.
fn ensure_same_tenant(actor: &CurrentActor, record: &WorkRecord) -> Result<(), CommandError> {
    if record.tenant_id() == actor.tenant_id {
        Ok(())
    } else {
        Err(CommandError::NotFound(record.id().to_string()))
    }
}

/// Whether the actor may read the record.
pub fn can_observe(actor: &CurrentActor, record: &WorkRecord) -> bool {
    record.tenant_id() == actor.tenant_id
        && (actor.role.is_privileged() || record.is_owned_by(&actor.user_id))
}

/// Read access, as an error when denied.
pub fn ensure_observe(actor: &CurrentActor, record: &WorkRecord) -> Result<(), CommandError> {
    ensure_same_tenant(actor, record)?;
    if can_observe(actor, record) {
        Ok(())
    } else {
        Err(CommandError::Forbidden(
            "employees may only view their own work records".into(),
        ))
    }
}

/// Detail updates. Approved records are frozen for everyone except admins.
pub fn ensure_modify(actor: &CurrentActor, record: &WorkRecord) -> Result<(), CommandError> {
    ensure_same_tenant(actor, record)?;
    match actor.role {
        Role::Admin => Ok(()),
        Role::Manager if record.status() == Status::Approved => Err(CommandError::Forbidden(
            "approved work records are immutable".into(),
        )),
        Role::Manager => Ok(()),
        Role::Employee if !record.is_owned_by(&actor.user_id) => Err(CommandError::Forbidden(
            "employees may only modify their own work records".into(),
        )),
        Role::Employee if record.status() == Status::Approved => Err(CommandError::Forbidden(
            "approved work records are immutable".into(),
        )),
        Role::Employee => Ok(()),
    }
}

/// Only the owner submits a record, whatever their role.
pub fn ensure_submit(actor: &CurrentActor, record: &WorkRecord) -> Result<(), CommandError> {
    ensure_same_tenant(actor, record)?;
    if record.is_owned_by(&actor.user_id) {
        Ok(())
    } else {
        Err(CommandError::Forbidden(
            "only the owner may submit a work record".into(),
        ))
    }
}

/// Role gate for approval, checked before the record is loaded.
pub fn ensure_approver(actor: &CurrentActor) -> Result<(), CommandError> {
    if actor.role == Role::Employee {
        Err(CommandError::Forbidden(
            "employees may not approve work records".into(),
        ))
    } else {
        Ok(())
    }
}

/// Approval window. Admins may act on approved records; managers may not.
pub fn ensure_approve(actor: &CurrentActor, record: &WorkRecord) -> Result<(), CommandError> {
    ensure_approver(actor)?;
    ensure_same_tenant(actor, record)?;
    if actor.role == Role::Manager && record.status() == Status::Approved {
        return Err(CommandError::Forbidden(
            "approved work records are immutable".into(),
        ));
    }
    Ok(())
}

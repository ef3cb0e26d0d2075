//! Permission checks against an actor's resolved grants.
//!
//! Checks fail closed: no grant row for the permission code means deny.
//! Role levels are available for coarse gates only.

use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::rbac::{Actor, CrudAction, STAFF_LEVEL};

/// Returns true when the actor holds `code` with the flag for `action`.
///
/// When `owner` is the actor itself, any grant on `code` is enough to read or
/// update the resource. Create and delete always need the explicit flag.
pub fn authorize(actor: &Actor, code: &str, action: CrudAction, owner: Option<Uuid>) -> bool {
    let Some(flags) = actor.grants.get(code) else {
        return false;
    };

    if flags.allows(action) {
        return true;
    }

    let is_owner = owner == Some(actor.user_id);
    is_owner && matches!(action, CrudAction::Read | CrudAction::Update)
}

/// Like [`authorize`] but returns `PermissionDenied` and records the denial.
pub fn ensure(
    actor: &Actor,
    code: &str,
    action: CrudAction,
    owner: Option<Uuid>,
) -> DomainResult<()> {
    if authorize(actor, code, action, owner) {
        return Ok(());
    }

    tracing::warn!(
        target: "audit",
        user_id = %actor.user_id,
        username = %actor.username,
        permission = %code,
        action = %action,
        roles = ?actor.role_codes(),
        "Permission denied"
    );

    Err(DomainError::denied(format!(
        "Missing {} permission on {}",
        action, code
    )))
}

pub fn requires_level(actor: &Actor, min_level: i32) -> bool {
    actor.max_level() >= min_level
}

pub fn ensure_level(actor: &Actor, min_level: i32) -> DomainResult<()> {
    if requires_level(actor, min_level) {
        return Ok(());
    }

    tracing::warn!(
        target: "audit",
        user_id = %actor.user_id,
        required_level = min_level,
        actual_level = actor.max_level(),
        "Role level too low"
    );

    Err(DomainError::denied(format!(
        "Requires role level {} or higher",
        min_level
    )))
}

pub fn is_staff(actor: &Actor) -> bool {
    requires_level(actor, STAFF_LEVEL)
}

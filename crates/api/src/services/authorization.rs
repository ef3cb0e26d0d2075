//! Actor resolution and role/permission administration.
//!
//! Every request that acts on the catalog resolves an [`Actor`]: the user's
//! active roles and the union of their active grants. Anonymous readers act
//! as the GUEST role.

use domain::models::rbac::{
    codes, roles, Actor, CreatePermissionRequest, CreateRoleRequest, CrudAction, CrudFlags,
    GrantSet, Permission, Role, RolePermission, RoleRef, UpdatePermissionRequest,
    UpdateRoleRequest,
};
use domain::services::ensure;
use domain::DomainError;
use persistence::repositories::{RbacRepository, UserRepository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Username reported for anonymous actors in audit records.
pub const GUEST_USERNAME: &str = "guest";

pub struct ActorLoader {
    users: UserRepository,
    rbac: RbacRepository,
}

impl ActorLoader {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            rbac: RbacRepository::new(pool),
        }
    }

    /// Resolves an authenticated user. Unknown or deactivated accounts are
    /// rejected as unauthorized so a revoked user's tokens stop working.
    pub async fn load(&self, user_id: Uuid) -> ApiResult<Actor> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::Unauthorized("Account is not active".into()))?;

        let roles = self.rbac.roles_for_user(user_id).await?;
        let grants = self.rbac.effective_grants(user_id).await?;

        Ok(Actor {
            user_id,
            username: user.username,
            roles,
            grants,
        })
    }

    /// The anonymous actor: GUEST grants under the nil user id.
    pub async fn guest(&self) -> ApiResult<Actor> {
        let Some(role) = self.rbac.find_role_by_code(roles::GUEST).await? else {
            return Ok(empty_guest());
        };
        if !role.is_active {
            return Ok(empty_guest());
        }

        let grants: GrantSet = self
            .rbac
            .list_grants(roles::GUEST)
            .await?
            .into_iter()
            .filter(|g| g.is_active)
            .map(|g| (g.permission_code.clone(), g.flags()))
            .collect();

        Ok(Actor {
            user_id: Uuid::nil(),
            username: GUEST_USERNAME.to_string(),
            roles: vec![RoleRef::from(&role)],
            grants,
        })
    }
}

fn empty_guest() -> Actor {
    Actor {
        user_id: Uuid::nil(),
        username: GUEST_USERNAME.to_string(),
        roles: Vec::new(),
        grants: GrantSet::new(),
    }
}

/// Role, permission, grant and assignment writes. All gated on `rbac.manage`.
pub struct RbacService {
    rbac: RbacRepository,
    users: UserRepository,
}

impl RbacService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rbac: RbacRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }

    pub async fn list_roles(&self, actor: &Actor) -> ApiResult<Vec<Role>> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Read, None)?;
        Ok(self
            .rbac
            .list_roles()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_role(&self, actor: &Actor, request: &CreateRoleRequest) -> ApiResult<Role> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Create, None)?;
        let role = self.rbac.create_role(request).await?;
        tracing::info!(target: "audit", actor = %actor.user_id, role = %role.code, "Role created");
        Ok(role.into())
    }

    pub async fn update_role(
        &self,
        actor: &Actor,
        code: &str,
        request: &UpdateRoleRequest,
    ) -> ApiResult<Role> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Update, None)?;
        let role = self.rbac.update_role(code, request).await?;
        tracing::info!(target: "audit", actor = %actor.user_id, role = %code, "Role updated");
        Ok(role.into())
    }

    pub async fn list_permissions(&self, actor: &Actor) -> ApiResult<Vec<Permission>> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Read, None)?;
        Ok(self
            .rbac
            .list_permissions()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_permission(
        &self,
        actor: &Actor,
        request: &CreatePermissionRequest,
    ) -> ApiResult<Permission> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Create, None)?;
        let permission = self.rbac.create_permission(request).await?;
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            permission = %permission.code,
            "Permission created"
        );
        Ok(permission.into())
    }

    pub async fn update_permission(
        &self,
        actor: &Actor,
        code: &str,
        request: &UpdatePermissionRequest,
    ) -> ApiResult<Permission> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Update, None)?;
        Ok(self.rbac.update_permission(code, request).await?.into())
    }

    pub async fn list_grants(&self, actor: &Actor, role_code: &str) -> ApiResult<Vec<RolePermission>> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Read, None)?;
        self.require_role(role_code).await?;
        Ok(self
            .rbac
            .list_grants(role_code)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Creates or replaces the grant of `permission_code` to `role_code`.
    pub async fn set_grant(
        &self,
        actor: &Actor,
        role_code: &str,
        permission_code: &str,
        flags: CrudFlags,
    ) -> ApiResult<RolePermission> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Update, None)?;
        let grant = self.rbac.set_grant(role_code, permission_code, flags).await?;
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            role = %role_code,
            permission = %permission_code,
            flags = ?flags,
            "Grant set"
        );
        Ok(grant.into())
    }

    pub async fn revoke_grant(
        &self,
        actor: &Actor,
        role_code: &str,
        permission_code: &str,
    ) -> ApiResult<()> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Delete, None)?;
        if !self.rbac.revoke_grant(role_code, permission_code).await? {
            return Err(ApiError::NotFound(format!(
                "Grant of {} to {} not found",
                permission_code, role_code
            )));
        }
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            role = %role_code,
            permission = %permission_code,
            "Grant revoked"
        );
        Ok(())
    }

    pub async fn assign_role(&self, actor: &Actor, user_id: Uuid, role_code: &str) -> ApiResult<()> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Update, None)?;
        self.require_user(user_id).await?;
        self.rbac
            .assign_role(user_id, role_code, Some(actor.user_id))
            .await?;
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            user_id = %user_id,
            role = %role_code,
            "Role assigned"
        );
        Ok(())
    }

    pub async fn remove_role(&self, actor: &Actor, user_id: Uuid, role_code: &str) -> ApiResult<()> {
        ensure(actor, codes::RBAC_MANAGE, CrudAction::Delete, None)?;
        if !self.rbac.remove_role(user_id, role_code).await? {
            return Err(ApiError::NotFound(format!(
                "User does not hold role {}",
                role_code
            )));
        }
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            user_id = %user_id,
            role = %role_code,
            "Role removed"
        );
        Ok(())
    }

    async fn require_role(&self, code: &str) -> ApiResult<()> {
        self.rbac
            .find_role_by_code(code)
            .await?
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("Role {}", code)).into())
    }

    async fn require_user(&self, user_id: Uuid) -> ApiResult<()> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("User").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_guest_has_no_grants() {
        let guest = empty_guest();
        assert!(guest.user_id.is_nil());
        assert!(guest.grants.is_empty());
        assert_eq!(guest.max_level(), 0);
        assert!(!domain::services::authorize(
            &guest,
            codes::PROMPT_VIEW,
            CrudAction::Read,
            None
        ));
    }
}

//! Role, permission and grant repository.

use std::collections::HashMap;

use domain::models::rbac::{
    CreatePermissionRequest, CreateRoleRequest, CrudFlags, GrantSet, RoleRef,
    UpdatePermissionRequest, UpdateRoleRequest,
};
use domain::services::check_parent;
use domain::DomainError;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{EffectiveGrantEntity, GrantEntity, PermissionEntity, RoleEntity};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const ROLE_COLUMNS: &str = "id, name, code, description, level, is_active, created_at";
const PERMISSION_COLUMNS: &str =
    "id, parent_id, name, code, module, description, is_active, created_at";

/// Repository for roles, permissions, grants and role assignments.
#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ===========================================
    // Roles
    // ===========================================

    pub async fn list_roles(&self) -> Result<Vec<RoleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_roles");
        let result = sqlx::query_as::<_, RoleEntity>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY level, code"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_role_by_code(&self, code: &str) -> Result<Option<RoleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_role_by_code");
        let result = sqlx::query_as::<_, RoleEntity>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create_role(&self, request: &CreateRoleRequest) -> RepositoryResult<RoleEntity> {
        let timer = QueryTimer::new("create_role");
        let result = sqlx::query_as::<_, RoleEntity>(&format!(
            r#"
            INSERT INTO roles (name, code, description, level)
            VALUES ($1, $2, $3, $4)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(&request.code)
        .bind(request.description.as_deref())
        .bind(request.level)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Role"))
    }

    pub async fn update_role(
        &self,
        code: &str,
        request: &UpdateRoleRequest,
    ) -> RepositoryResult<RoleEntity> {
        let timer = QueryTimer::new("update_role");
        let result = sqlx::query_as::<_, RoleEntity>(&format!(
            r#"
            UPDATE roles SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                level = COALESCE($4, level),
                is_active = COALESCE($5, is_active)
            WHERE code = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(request.name.as_deref())
        .bind(request.description.as_deref())
        .bind(request.level)
        .bind(request.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(|e| RepositoryError::from_write(e, "Role"))?
            .ok_or_else(|| RepositoryError::not_found(format!("Role {code}")))
    }

    // ===========================================
    // Permissions
    // ===========================================

    pub async fn list_permissions(&self) -> Result<Vec<PermissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_permissions");
        let result = sqlx::query_as::<_, PermissionEntity>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY module, code"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_permission_by_code(
        &self,
        code: &str,
    ) -> Result<Option<PermissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_permission_by_code");
        let result = sqlx::query_as::<_, PermissionEntity>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create_permission(
        &self,
        request: &CreatePermissionRequest,
    ) -> RepositoryResult<PermissionEntity> {
        let timer = QueryTimer::new("create_permission");
        let mut tx = self.pool.begin().await?;

        let parent_id = match request.parent_code.as_deref() {
            Some(code) => Some(permission_id_in(&mut tx, code).await?),
            None => None,
        };

        let entity = sqlx::query_as::<_, PermissionEntity>(&format!(
            r#"
            INSERT INTO permissions (parent_id, name, code, module, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PERMISSION_COLUMNS}
            "#
        ))
        .bind(parent_id)
        .bind(&request.name)
        .bind(&request.code)
        .bind(&request.module)
        .bind(request.description.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Permission"))?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Update a permission. An empty `parent_code` detaches it from its parent;
    /// any other value is resolved and checked against the ancestor chain.
    pub async fn update_permission(
        &self,
        code: &str,
        request: &UpdatePermissionRequest,
    ) -> RepositoryResult<PermissionEntity> {
        let timer = QueryTimer::new("update_permission");
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('permissions.tree'))")
            .execute(&mut *tx)
            .await?;

        let id = permission_id_in(&mut tx, code).await?;

        let (reparent, parent_id) = match request.parent_code.as_deref() {
            None => (false, None),
            Some("") => (true, None),
            Some(parent_code) => {
                let parent_id = permission_id_in(&mut tx, parent_code).await?;
                let parents: HashMap<Uuid, Option<Uuid>> =
                    sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
                        "SELECT id, parent_id FROM permissions",
                    )
                    .fetch_all(&mut *tx)
                    .await?
                    .into_iter()
                    .collect();
                check_parent(id, Some(parent_id), &parents)?;
                (true, Some(parent_id))
            }
        };

        let entity = sqlx::query_as::<_, PermissionEntity>(&format!(
            r#"
            UPDATE permissions SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_active = COALESCE($4, is_active),
                parent_id = CASE WHEN $5 THEN $6 ELSE parent_id END
            WHERE id = $1
            RETURNING {PERMISSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.as_deref())
        .bind(request.description.as_deref())
        .bind(request.is_active)
        .bind(reparent)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Permission"))?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    // ===========================================
    // Grants
    // ===========================================

    pub async fn list_grants(&self, role_code: &str) -> Result<Vec<GrantEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_role_grants");
        let result = sqlx::query_as::<_, GrantEntity>(
            r#"
            SELECT rp.role_id, rp.permission_id, p.code AS permission_code,
                   rp.can_create, rp.can_read, rp.can_update, rp.can_delete, rp.is_active
            FROM role_permissions rp
            JOIN roles r ON r.id = rp.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE r.code = $1
            ORDER BY p.code
            "#,
        )
        .bind(role_code)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert or replace the CRUD flags of a role on a permission.
    pub async fn set_grant(
        &self,
        role_code: &str,
        permission_code: &str,
        flags: CrudFlags,
    ) -> RepositoryResult<GrantEntity> {
        let timer = QueryTimer::new("set_role_grant");
        let result = sqlx::query_as::<_, GrantEntity>(
            r#"
            WITH r AS (SELECT id FROM roles WHERE code = $1),
                 p AS (SELECT id, code FROM permissions WHERE code = $2),
                 up AS (
                     INSERT INTO role_permissions
                         (role_id, permission_id, can_create, can_read, can_update, can_delete, is_active)
                     SELECT r.id, p.id, $3, $4, $5, $6, TRUE FROM r, p
                     ON CONFLICT (role_id, permission_id) DO UPDATE SET
                         can_create = EXCLUDED.can_create,
                         can_read = EXCLUDED.can_read,
                         can_update = EXCLUDED.can_update,
                         can_delete = EXCLUDED.can_delete,
                         is_active = TRUE
                     RETURNING role_id, permission_id, can_create, can_read, can_update, can_delete, is_active
                 )
            SELECT up.role_id, up.permission_id, p.code AS permission_code,
                   up.can_create, up.can_read, up.can_update, up.can_delete, up.is_active
            FROM up JOIN p ON p.id = up.permission_id
            "#,
        )
        .bind(role_code)
        .bind(permission_code)
        .bind(flags.can_create)
        .bind(flags.can_read)
        .bind(flags.can_update)
        .bind(flags.can_delete)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.ok_or_else(|| {
            RepositoryError::not_found(format!("Role {role_code} or permission {permission_code}"))
        })
    }

    /// Remove a grant. Returns false if none existed.
    pub async fn revoke_grant(
        &self,
        role_code: &str,
        permission_code: &str,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("revoke_role_grant");
        let result = sqlx::query(
            r#"
            DELETE FROM role_permissions rp
            USING roles r, permissions p
            WHERE rp.role_id = r.id AND rp.permission_id = p.id
              AND r.code = $1 AND p.code = $2
            "#,
        )
        .bind(role_code)
        .bind(permission_code)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    // ===========================================
    // User role assignments
    // ===========================================

    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_code: &str,
        assigned_by: Option<Uuid>,
    ) -> RepositoryResult<()> {
        let timer = QueryTimer::new("assign_user_role");
        let role = self
            .find_role_by_code(role_code)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Role {role_code}")))?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.id)
        .bind(assigned_by)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "User role"))?;
        timer.record();
        Ok(())
    }

    pub async fn remove_role(&self, user_id: Uuid, role_code: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("remove_user_role");
        let result = sqlx::query(
            r#"
            DELETE FROM user_roles ur
            USING roles r
            WHERE ur.role_id = r.id AND ur.user_id = $1 AND r.code = $2
            "#,
        )
        .bind(user_id)
        .bind(role_code)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Active roles held by a user.
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<RoleRef>, sqlx::Error> {
        let timer = QueryTimer::new("roles_for_user");
        let rows = sqlx::query_as::<_, RoleEntity>(
            r#"
            SELECT r.id, r.name, r.code, r.description, r.level, r.is_active, r.created_at
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND r.is_active
            ORDER BY r.level DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(rows?.iter().map(RoleRef::from).collect())
    }

    /// Union of active grants over the user's active roles and active permissions.
    pub async fn effective_grants(&self, user_id: Uuid) -> Result<GrantSet, sqlx::Error> {
        let timer = QueryTimer::new("effective_grants");
        let rows = sqlx::query_as::<_, EffectiveGrantEntity>(
            r#"
            SELECT p.code AS permission_code,
                   rp.can_create, rp.can_read, rp.can_update, rp.can_delete
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id AND r.is_active
            JOIN role_permissions rp ON rp.role_id = r.id AND rp.is_active
            JOIN permissions p ON p.id = rp.permission_id AND p.is_active
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(rows?.into_iter().map(Into::into).collect())
    }
}

async fn permission_id_in(conn: &mut PgConnection, code: &str) -> RepositoryResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM permissions WHERE code = $1")
        .bind(code)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Permission {code}")).into())
}

//! Role and permission entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::rbac::{CrudFlags, Permission, Role, RolePermission, RoleRef};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the roles table.
#[derive(Debug, Clone, FromRow)]
pub struct RoleEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<RoleEntity> for Role {
    fn from(entity: RoleEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            description: entity.description,
            level: entity.level,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

impl From<&RoleEntity> for RoleRef {
    fn from(entity: &RoleEntity) -> Self {
        Self {
            code: entity.code.clone(),
            level: entity.level,
        }
    }
}

/// Database row mapping for the permissions table.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionEntity {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub module: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PermissionEntity> for Permission {
    fn from(entity: PermissionEntity) -> Self {
        Self {
            id: entity.id,
            parent_id: entity.parent_id,
            name: entity.name,
            code: entity.code,
            module: entity.module,
            description: entity.description,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// A role_permissions row joined with its permission code.
#[derive(Debug, Clone, FromRow)]
pub struct GrantEntity {
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub permission_code: String,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub is_active: bool,
}

impl GrantEntity {
    pub fn flags(&self) -> CrudFlags {
        CrudFlags {
            can_create: self.can_create,
            can_read: self.can_read,
            can_update: self.can_update,
            can_delete: self.can_delete,
        }
    }
}

impl From<GrantEntity> for RolePermission {
    fn from(entity: GrantEntity) -> Self {
        let flags = entity.flags();
        Self {
            role_id: entity.role_id,
            permission_id: entity.permission_id,
            permission_code: entity.permission_code,
            flags,
            is_active: entity.is_active,
        }
    }
}

/// Effective grant of a user: permission code plus flags, one row per granting role.
#[derive(Debug, Clone, FromRow)]
pub struct EffectiveGrantEntity {
    pub permission_code: String,
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl From<EffectiveGrantEntity> for (String, CrudFlags) {
    fn from(entity: EffectiveGrantEntity) -> Self {
        (
            entity.permission_code,
            CrudFlags {
                can_create: entity.can_create,
                can_read: entity.can_read,
                can_update: entity.can_update,
                can_delete: entity.can_delete,
            },
        )
    }
}

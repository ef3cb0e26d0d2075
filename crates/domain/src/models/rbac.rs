//! Role-based access control models.
//!
//! Roles are granted permissions with per-permission CRUD flags. An actor's
//! effective grants are the union of the grants of all its active roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Well-known permission codes.
pub mod codes {
    pub const PROMPT_VIEW: &str = "prompt.view";
    pub const PROMPT_CREATE: &str = "prompt.create";
    pub const PROMPT_EDIT: &str = "prompt.edit";
    pub const PROMPT_DELETE: &str = "prompt.delete";
    pub const PROMPT_VIEW_PREMIUM: &str = "prompt.view_premium";
    pub const PROMPT_PUBLISH: &str = "prompt.publish";
    pub const PROMPT_ARCHIVE: &str = "prompt.archive";
    pub const PROMPT_STATUS_OVERRIDE: &str = "prompt.status_override";
    pub const COMMENT_MODERATE: &str = "comment.moderate";
    pub const TAXONOMY_MANAGE: &str = "taxonomy.manage";
    pub const COMMERCE_MANAGE: &str = "commerce.manage";
    pub const CONFIG_MANAGE: &str = "config.manage";
    pub const RBAC_MANAGE: &str = "rbac.manage";
}

/// Well-known role codes.
pub mod roles {
    pub const GUEST: &str = "GUEST";
    pub const MEMBER: &str = "MEMBER";
    pub const PREMIUM: &str = "PREMIUM";
    pub const EDITOR: &str = "EDITOR";
    pub const MODERATOR: &str = "MODERATOR";
    pub const ADMIN: &str = "ADMIN";
}

/// Level at or above which an actor counts as staff for catalog reads.
pub const STAFF_LEVEL: i32 = 5;

/// The four operations a grant can allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudAction {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudAction::Create => "create",
            CrudAction::Read => "read",
            CrudAction::Update => "update",
            CrudAction::Delete => "delete",
        }
    }
}

impl fmt::Display for CrudAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrudAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(CrudAction::Create),
            "read" => Ok(CrudAction::Read),
            "update" => Ok(CrudAction::Update),
            "delete" => Ok(CrudAction::Delete),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// CRUD flags carried by a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudFlags {
    pub can_create: bool,
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl CrudFlags {
    pub const ALL: CrudFlags = CrudFlags {
        can_create: true,
        can_read: true,
        can_update: true,
        can_delete: true,
    };

    pub const READ_ONLY: CrudFlags = CrudFlags {
        can_create: false,
        can_read: true,
        can_update: false,
        can_delete: false,
    };

    pub fn allows(&self, action: CrudAction) -> bool {
        match action {
            CrudAction::Create => self.can_create,
            CrudAction::Read => self.can_read,
            CrudAction::Update => self.can_update,
            CrudAction::Delete => self.can_delete,
        }
    }

    pub fn union(self, other: CrudFlags) -> CrudFlags {
        CrudFlags {
            can_create: self.can_create || other.can_create,
            can_read: self.can_read || other.can_read,
            can_update: self.can_update || other.can_update,
            can_delete: self.can_delete || other.can_delete,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub module: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A role-permission grant row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub permission_code: String,
    #[serde(flatten)]
    pub flags: CrudFlags,
    pub is_active: bool,
}

/// Role summary carried on an authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRef {
    pub code: String,
    pub level: i32,
}

/// Effective grants keyed by permission code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantSet(HashMap<String, CrudFlags>);

impl GrantSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a grant, OR-ing flags with any grant already present for the code.
    pub fn merge(&mut self, code: impl Into<String>, flags: CrudFlags) {
        self.0
            .entry(code.into())
            .and_modify(|existing| *existing = existing.union(flags))
            .or_insert(flags);
    }

    pub fn get(&self, code: &str) -> Option<CrudFlags> {
        self.0.get(code).copied()
    }

    pub fn remove(&mut self, code: &str) -> Option<CrudFlags> {
        self.0.remove(code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, CrudFlags)> for GrantSet {
    fn from_iter<I: IntoIterator<Item = (String, CrudFlags)>>(iter: I) -> Self {
        let mut set = GrantSet::new();
        for (code, flags) in iter {
            set.merge(code, flags);
        }
        set
    }
}

/// An authenticated principal with its resolved roles and grants.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    pub roles: Vec<RoleRef>,
    pub grants: GrantSet,
}

impl Actor {
    pub fn has_role(&self, code: &str) -> bool {
        self.roles.iter().any(|r| r.code == code)
    }

    pub fn max_level(&self) -> i32 {
        self.roles.iter().map(|r| r.level).max().unwrap_or(0)
    }

    pub fn role_codes(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.code.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    #[validate(length(max = 30, message = "Code must be at most 30 characters"))]
    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    #[validate(range(min = 0, max = 100, message = "Level must be between 0 and 100"))]
    pub level: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    #[validate(range(min = 0, max = 100))]
    pub level: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(min = 1, max = 50))]
    pub module: String,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    pub parent_code: Option<String>,
}

/// Update for a permission. `parent_code: Some("")` detaches from the parent.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePermissionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    pub parent_code: Option<String>,

    pub is_active: Option<bool>,
}

/// Grant payload. `can_read` defaults to true.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GrantRequest {
    #[serde(default)]
    pub can_create: bool,
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
}

fn default_true() -> bool {
    true
}

impl From<GrantRequest> for CrudFlags {
    fn from(req: GrantRequest) -> Self {
        CrudFlags {
            can_create: req.can_create,
            can_read: req.can_read,
            can_update: req.can_update,
            can_delete: req.can_delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_allow_matching_action_only() {
        let flags = CrudFlags {
            can_update: true,
            ..Default::default()
        };
        assert!(flags.allows(CrudAction::Update));
        assert!(!flags.allows(CrudAction::Read));
        assert!(!flags.allows(CrudAction::Delete));
        assert!(CrudFlags::ALL.allows(CrudAction::Delete));
    }

    #[test]
    fn test_grant_set_merge_unions_flags() {
        let mut set = GrantSet::new();
        set.merge(codes::PROMPT_EDIT, CrudFlags::READ_ONLY);
        set.merge(
            codes::PROMPT_EDIT,
            CrudFlags {
                can_update: true,
                ..Default::default()
            },
        );

        let flags = set.get(codes::PROMPT_EDIT).unwrap();
        assert!(flags.can_read && flags.can_update);
        assert!(!flags.can_delete);
        assert!(set.get(codes::PROMPT_VIEW).is_none());
    }

    #[test]
    fn test_grant_set_from_iter() {
        let set: GrantSet = vec![
            (codes::PROMPT_VIEW.to_string(), CrudFlags::READ_ONLY),
            (codes::PROMPT_CREATE.to_string(), CrudFlags::ALL),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.get(codes::PROMPT_VIEW), Some(CrudFlags::READ_ONLY));
        assert_eq!(set.get(codes::PROMPT_CREATE), Some(CrudFlags::ALL));
        assert!(set.get(codes::RBAC_MANAGE).is_none());
    }

    #[test]
    fn test_grant_request_defaults_read() {
        let req: GrantRequest = serde_json::from_str("{}").unwrap();
        let flags: CrudFlags = req.into();
        assert_eq!(flags, CrudFlags::READ_ONLY);
    }

    #[test]
    fn test_crud_action_parse() {
        assert_eq!("UPDATE".parse::<CrudAction>().unwrap(), CrudAction::Update);
        assert!("archive".parse::<CrudAction>().is_err());
        assert_eq!(CrudAction::Delete.to_string(), "delete");
    }

    #[test]
    fn test_actor_levels() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            username: "mod".into(),
            roles: vec![
                RoleRef {
                    code: roles::MEMBER.into(),
                    level: 2,
                },
                RoleRef {
                    code: roles::MODERATOR.into(),
                    level: 6,
                },
            ],
            grants: GrantSet::new(),
        };
        assert_eq!(actor.max_level(), 6);
        assert!(actor.has_role(roles::MODERATOR));
        assert!(!actor.has_role(roles::ADMIN));
    }

    #[test]
    fn test_create_role_validation() {
        let req = CreateRoleRequest {
            name: "Reviewer".into(),
            code: "REVIEWER".into(),
            description: None,
            level: 4,
        };
        assert!(req.validate().is_ok());

        let bad = CreateRoleRequest {
            level: 101,
            ..req.clone()
        };
        assert!(bad.validate().is_err());

        let bad = CreateRoleRequest {
            code: "has space".into(),
            ..req
        };
        assert!(bad.validate().is_err());
    }
}

//! Reference data seeding. Every row is upserted by its business key, so
//! applying the same data twice leaves the database unchanged.

use domain::models::commerce::PlanType;
use domain::models::rbac::{codes, roles, CrudFlags};
use domain::models::system_config::{keys, ConfigType};
use serde::Serialize;
use sqlx::PgPool;

use crate::entities::{ConfigTypeDb, PlanTypeDb};
use crate::metrics::QueryTimer;

#[derive(Debug, Clone)]
pub struct RoleSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub level: i32,
}

#[derive(Debug, Clone)]
pub struct PermissionSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub module: &'static str,
    pub parent: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct GrantSeed {
    pub role: &'static str,
    pub permission: &'static str,
    pub flags: CrudFlags,
}

#[derive(Debug, Clone)]
pub struct LevelSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub ticket_cost: i32,
    pub requires_premium: bool,
}

#[derive(Debug, Clone)]
pub struct PlatformSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub company: &'static str,
}

#[derive(Debug, Clone)]
pub struct CategorySeed {
    pub code: &'static str,
    pub name: &'static str,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct PlanSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub plan_type: PlanType,
    pub duration_days: i32,
    pub ticket_amount: i32,
    pub price_cents: i64,
    pub can_access_premium: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigSeed {
    pub key: &'static str,
    pub value: &'static str,
    pub config_type: ConfigType,
    pub description: &'static str,
    pub is_public: bool,
}

/// Complete reference data set.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub roles: Vec<RoleSeed>,
    pub permissions: Vec<PermissionSeed>,
    pub grants: Vec<GrantSeed>,
    pub levels: Vec<LevelSeed>,
    pub platforms: Vec<PlatformSeed>,
    pub categories: Vec<CategorySeed>,
    pub plans: Vec<PlanSeed>,
    pub config: Vec<ConfigSeed>,
}

const R: CrudFlags = CrudFlags::READ_ONLY;
const CR: CrudFlags = CrudFlags {
    can_create: true,
    can_read: true,
    can_update: false,
    can_delete: false,
};
const RU: CrudFlags = CrudFlags {
    can_create: false,
    can_read: true,
    can_update: true,
    can_delete: false,
};
const RD: CrudFlags = CrudFlags {
    can_create: false,
    can_read: true,
    can_update: false,
    can_delete: true,
};
const ALL: CrudFlags = CrudFlags::ALL;

impl SeedData {
    /// The standard catalog reference data.
    pub fn standard() -> Self {
        let role = |code, name, level| RoleSeed { code, name, level };
        let permission = |code, name, module, parent| PermissionSeed {
            code,
            name,
            module,
            parent,
        };

        let permissions = vec![
            permission(codes::PROMPT_VIEW, "View prompts", "prompt", None),
            permission(codes::PROMPT_CREATE, "Create prompts", "prompt", None),
            permission(codes::PROMPT_EDIT, "Edit prompts", "prompt", None),
            permission(codes::PROMPT_DELETE, "Delete prompts", "prompt", None),
            permission(
                codes::PROMPT_VIEW_PREMIUM,
                "View premium prompts",
                "prompt",
                Some(codes::PROMPT_VIEW),
            ),
            permission(codes::PROMPT_PUBLISH, "Publish prompts", "prompt", Some(codes::PROMPT_EDIT)),
            permission(codes::PROMPT_ARCHIVE, "Archive prompts", "prompt", Some(codes::PROMPT_EDIT)),
            permission(
                codes::PROMPT_STATUS_OVERRIDE,
                "Override prompt status",
                "prompt",
                Some(codes::PROMPT_PUBLISH),
            ),
            permission(codes::COMMENT_MODERATE, "Moderate comments", "comment", None),
            permission(codes::TAXONOMY_MANAGE, "Manage taxonomy", "taxonomy", None),
            permission(codes::COMMERCE_MANAGE, "Manage plans", "commerce", None),
            permission(codes::CONFIG_MANAGE, "Manage configuration", "config", None),
            permission(codes::RBAC_MANAGE, "Manage roles and permissions", "rbac", None),
        ];

        let member = [
            (codes::PROMPT_VIEW, R),
            (codes::PROMPT_CREATE, CR),
            (codes::PROMPT_EDIT, R),
        ];
        let editor = [
            (codes::PROMPT_VIEW, ALL),
            (codes::PROMPT_VIEW_PREMIUM, R),
            (codes::PROMPT_CREATE, ALL),
            (codes::PROMPT_EDIT, ALL),
            (codes::PROMPT_PUBLISH, RU),
            (codes::PROMPT_ARCHIVE, RU),
            (codes::TAXONOMY_MANAGE, ALL),
        ];

        let mut grants = Vec::new();
        let mut grant = |role: &'static str, list: &[(&'static str, CrudFlags)]| {
            grants.extend(list.iter().map(|(permission, flags)| GrantSeed {
                role,
                permission: *permission,
                flags: *flags,
            }));
        };
        grant(roles::GUEST, &[(codes::PROMPT_VIEW, R)]);
        grant(roles::MEMBER, &member);
        grant(roles::PREMIUM, &member);
        grant(roles::PREMIUM, &[(codes::PROMPT_VIEW_PREMIUM, R)]);
        grant(roles::EDITOR, &editor);
        grant(roles::MODERATOR, &editor);
        grant(
            roles::MODERATOR,
            &[(codes::COMMENT_MODERATE, RU), (codes::PROMPT_DELETE, RD)],
        );
        let admin: Vec<(&'static str, CrudFlags)> =
            permissions.iter().map(|p| (p.code, ALL)).collect();
        grant(roles::ADMIN, &admin);

        let level = |code, name, ticket_cost, requires_premium| LevelSeed {
            code,
            name,
            ticket_cost,
            requires_premium,
        };
        let platform = |code, name, company| PlatformSeed {
            code,
            name,
            company,
        };
        let category = |code, name, sort_order| CategorySeed {
            code,
            name,
            sort_order,
        };

        Self {
            roles: vec![
                role(roles::GUEST, "Guest", 1),
                role(roles::MEMBER, "Member", 2),
                role(roles::PREMIUM, "Premium member", 3),
                role(roles::EDITOR, "Editor", 5),
                role(roles::MODERATOR, "Moderator", 6),
                role(roles::ADMIN, "Administrator", 10),
            ],
            permissions,
            grants,
            levels: vec![
                level("BASIC", "Basic", 0, false),
                level("INTERMEDIATE", "Intermediate", 0, false),
                level("ADVANCED", "Advanced", 1, false),
                level("EXPERT", "Expert", 2, true),
                level("PREMIUM", "Premium", 5, true),
            ],
            platforms: vec![
                platform("chatgpt", "ChatGPT", "OpenAI"),
                platform("claude", "Claude", "Anthropic"),
                platform("gemini", "Gemini", "Google"),
                platform("copilot", "Copilot", "Microsoft"),
            ],
            categories: vec![
                category("writing", "Writing", 1),
                category("coding", "Coding", 2),
                category("marketing", "Marketing", 3),
                category("education", "Education", 4),
                category("business", "Business", 5),
            ],
            plans: vec![
                PlanSeed {
                    code: "FREE",
                    name: "Free",
                    plan_type: PlanType::Free,
                    duration_days: 36500,
                    ticket_amount: 5,
                    price_cents: 0,
                    can_access_premium: false,
                },
                PlanSeed {
                    code: "BASIC_MONTH",
                    name: "Basic monthly",
                    plan_type: PlanType::Basic,
                    duration_days: 30,
                    ticket_amount: 50,
                    price_cents: 49_000,
                    can_access_premium: false,
                },
                PlanSeed {
                    code: "PRO_MONTH",
                    name: "Pro monthly",
                    plan_type: PlanType::Pro,
                    duration_days: 30,
                    ticket_amount: 200,
                    price_cents: 149_000,
                    can_access_premium: true,
                },
            ],
            config: vec![
                ConfigSeed {
                    key: keys::SITE_NAME,
                    value: "PromptHub",
                    config_type: ConfigType::String,
                    description: "Display name of the site",
                    is_public: true,
                },
                ConfigSeed {
                    key: keys::ONE_PURCHASE_PER_PROMPT,
                    value: "true",
                    config_type: ConfigType::Boolean,
                    description: "Refuse a second purchase of the same prompt",
                    is_public: false,
                },
                ConfigSeed {
                    key: keys::REGISTRATION_OPEN,
                    value: "true",
                    config_type: ConfigType::Boolean,
                    description: "Whether new accounts can register",
                    is_public: true,
                },
                ConfigSeed {
                    key: keys::CATALOG_PAGE_SIZE,
                    value: "20",
                    config_type: ConfigType::Integer,
                    description: "Default catalog page size",
                    is_public: true,
                },
            ],
        }
    }
}

/// Rows written per kind.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeedReport {
    pub roles: u64,
    pub permissions: u64,
    pub grants: u64,
    pub levels: u64,
    pub platforms: u64,
    pub categories: u64,
    pub plans: u64,
    pub config: u64,
}

#[derive(Clone)]
pub struct SeedRepository {
    pool: PgPool,
}

impl SeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the seed set in one transaction.
    ///
    /// Existing config entries are never overwritten so runtime changes survive a reseed.
    pub async fn apply(&self, data: &SeedData) -> Result<SeedReport, sqlx::Error> {
        let timer = QueryTimer::new("apply_seed");
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        for role in &data.roles {
            report.roles += sqlx::query(
                r#"
                INSERT INTO roles (code, name, level) VALUES ($1, $2, $3)
                ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name, level = EXCLUDED.level
                "#,
            )
            .bind(role.code)
            .bind(role.name)
            .bind(role.level)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for permission in &data.permissions {
            report.permissions += sqlx::query(
                r#"
                INSERT INTO permissions (code, name, module) VALUES ($1, $2, $3)
                ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name, module = EXCLUDED.module
                "#,
            )
            .bind(permission.code)
            .bind(permission.name)
            .bind(permission.module)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for permission in &data.permissions {
            sqlx::query(
                r#"
                UPDATE permissions
                SET parent_id = (SELECT id FROM permissions WHERE code = $2)
                WHERE code = $1
                "#,
            )
            .bind(permission.code)
            .bind(permission.parent)
            .execute(&mut *tx)
            .await?;
        }

        for grant in &data.grants {
            report.grants += sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id, can_create, can_read, can_update, can_delete)
                SELECT r.id, p.id, $3, $4, $5, $6
                FROM roles r, permissions p
                WHERE r.code = $1 AND p.code = $2
                ON CONFLICT (role_id, permission_id) DO UPDATE SET
                    can_create = role_permissions.can_create OR EXCLUDED.can_create,
                    can_read = role_permissions.can_read OR EXCLUDED.can_read,
                    can_update = role_permissions.can_update OR EXCLUDED.can_update,
                    can_delete = role_permissions.can_delete OR EXCLUDED.can_delete
                "#,
            )
            .bind(grant.role)
            .bind(grant.permission)
            .bind(grant.flags.can_create)
            .bind(grant.flags.can_read)
            .bind(grant.flags.can_update)
            .bind(grant.flags.can_delete)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for level in &data.levels {
            report.levels += sqlx::query(
                r#"
                INSERT INTO prompt_levels (code, name, ticket_cost, requires_premium)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    ticket_cost = EXCLUDED.ticket_cost,
                    requires_premium = EXCLUDED.requires_premium
                "#,
            )
            .bind(level.code)
            .bind(level.name)
            .bind(level.ticket_cost)
            .bind(level.requires_premium)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for platform in &data.platforms {
            report.platforms += sqlx::query(
                r#"
                INSERT INTO ai_platforms (code, name, company_name) VALUES ($1, $2, $3)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    company_name = EXCLUDED.company_name
                "#,
            )
            .bind(platform.code)
            .bind(platform.name)
            .bind(platform.company)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for category in &data.categories {
            report.categories += sqlx::query(
                r#"
                INSERT INTO categories (code, name, sort_order) VALUES ($1, $2, $3)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(category.code)
            .bind(category.name)
            .bind(category.sort_order)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for plan in &data.plans {
            report.plans += sqlx::query(
                r#"
                INSERT INTO subscription_plans
                    (code, name, plan_type, duration_days, ticket_amount, price_cents, can_access_premium)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    plan_type = EXCLUDED.plan_type,
                    duration_days = EXCLUDED.duration_days,
                    ticket_amount = EXCLUDED.ticket_amount,
                    price_cents = EXCLUDED.price_cents,
                    can_access_premium = EXCLUDED.can_access_premium
                "#,
            )
            .bind(plan.code)
            .bind(plan.name)
            .bind(PlanTypeDb::from(plan.plan_type))
            .bind(plan.duration_days)
            .bind(plan.ticket_amount)
            .bind(plan.price_cents)
            .bind(plan.can_access_premium)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for entry in &data.config {
            report.config += sqlx::query(
                r#"
                INSERT INTO system_config (key, value, config_type, description, is_public)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (key) DO NOTHING
                "#,
            )
            .bind(entry.key)
            .bind(entry.value)
            .bind(ConfigTypeDb::from(entry.config_type))
            .bind(entry.description)
            .bind(entry.is_public)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        timer.record();
        tracing::info!(?report, "Seed data applied");
        Ok(report)
    }
}

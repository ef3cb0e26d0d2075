//! Optional administrator account created at startup.
//!
//! Runs after migrations and seeding. When `seed.admin_email` and
//! `seed.admin_password` are both set, the account is created if missing and
//! the ADMIN role is (re)assigned. Running it again is harmless.

use domain::models::rbac::roles;
use persistence::repositories::{NewUser, RbacRepository, UserRepository};
use persistence::RepositoryError;
use shared::password::{hash_password, validate_password_strength, PasswordError};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::SeedConfig;

const DEFAULT_ADMIN_USERNAME: &str = "admin";

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

/// What the bootstrap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    NotConfigured,
    Created,
    AlreadyPresent,
}

fn credentials(config: &SeedConfig) -> Option<(&str, &str, &str)> {
    let email = config.admin_email.as_deref().map(str::trim).filter(|e| !e.is_empty())?;
    let Some(password) = config.admin_password.as_deref().filter(|p| !p.is_empty()) else {
        warn!("seed.admin_email is set but seed.admin_password is empty, skipping admin bootstrap");
        return None;
    };
    let username = config
        .admin_username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_ADMIN_USERNAME);
    Some((username, email, password))
}

pub async fn bootstrap_admin(
    pool: &PgPool,
    config: &SeedConfig,
) -> Result<BootstrapOutcome, BootstrapError> {
    let Some((username, email, password)) = credentials(config) else {
        return Ok(BootstrapOutcome::NotConfigured);
    };

    let users = UserRepository::new(pool.clone());
    let rbac = RbacRepository::new(pool.clone());

    if let Some(existing) = users.find_by_login(email).await? {
        rbac.assign_role(existing.id, roles::ADMIN, None).await?;
        info!(user_id = %existing.id, "Bootstrap admin already present, ADMIN role ensured");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    validate_password_strength(password)?;
    let password_hash = hash_password(password)?;
    let email = email.to_lowercase();

    let user = users
        .create_user(
            NewUser {
                username,
                email: &email,
                password_hash: &password_hash,
                first_name: None,
                last_name: None,
                phone: None,
            },
            roles::MEMBER,
        )
        .await?;
    rbac.assign_role(user.id, roles::ADMIN, None).await?;

    info!(user_id = %user.id, username = %username, "Bootstrap admin created");
    warn!("Remove seed.admin_password from configuration after initial setup");

    Ok(BootstrapOutcome::Created)
}

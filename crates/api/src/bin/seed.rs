//! Applies migrations and the reference data set, then bootstraps the admin
//! account when configured. Safe to run repeatedly.

use anyhow::{Context, Result};
use persistence::repositories::{SeedData, SeedRepository};
use tracing::info;

use prompthub_api::{config, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::Config::load().context("Failed to load configuration")?;
    middleware::logging::init_logging(&config.logging)?;

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;
    persistence::db::run_migrations(&pool).await?;

    let report = SeedRepository::new(pool.clone())
        .apply(&SeedData::standard())
        .await
        .context("Seeding failed")?;
    info!(
        roles = report.roles,
        permissions = report.permissions,
        grants = report.grants,
        levels = report.levels,
        platforms = report.platforms,
        categories = report.categories,
        plans = report.plans,
        config = report.config,
        "Reference data applied"
    );

    let outcome = services::admin_bootstrap::bootstrap_admin(&pool, &config.seed).await?;
    info!(outcome = ?outcome, "Admin bootstrap finished");

    pool.close().await;
    Ok(())
}

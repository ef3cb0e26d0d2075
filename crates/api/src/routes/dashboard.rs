//! Seller and admin statistics, and on-demand counter reconciliation.

use axum::{extract::State, Json};
use domain::models::dashboard::{AdminStats, DashboardStats};
use domain::models::rbac::{codes, CrudAction, STAFF_LEVEL};
use domain::services::{ensure, ensure_level};
use persistence::repositories::{DashboardRepository, ReconcileReport, ReconciliationRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentActor;

/// Totals for the caller's own prompts.
///
/// GET /api/v1/dashboard/stats
pub async fn seller_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = DashboardRepository::new(state.pool.clone())
        .catalog_stats(Some(actor.user_id))
        .await?;
    Ok(Json(stats))
}

/// Site-wide totals. Staff only.
///
/// GET /api/v1/admin/stats
pub async fn admin_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<AdminStats>, ApiError> {
    ensure_level(&actor, STAFF_LEVEL)?;

    let stats = DashboardRepository::new(state.pool.clone())
        .admin_stats()
        .await?;
    Ok(Json(stats))
}

/// Runs the counter reconciliation now instead of waiting for the job.
///
/// POST /api/v1/admin/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ReconcileReport>, ApiError> {
    ensure(&actor, codes::CONFIG_MANAGE, CrudAction::Update, None)?;

    let report = ReconciliationRepository::new(state.pool.clone())
        .reconcile()
        .await?;
    tracing::info!(
        target: "audit",
        actor = %actor.user_id,
        prompts_fixed = report.prompts_fixed,
        tags_fixed = report.tags_fixed,
        "Counters reconciled on demand"
    );
    Ok(Json(report))
}

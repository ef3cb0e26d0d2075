//! Plans, subscriptions, access checks, unlocks and purchases.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::commerce::{
    AccessDecision, CreatePlanRequest, Purchase, PurchaseRecord, PurchaseRequest,
    SubscriptionPlan, UnlockResult, UpdatePlanRequest, UserSubscription,
};
use shared::pagination::Page;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentActor, Viewer};
use crate::routes::engagement::PageQuery;
use crate::services::CommerceService;

fn commerce_service(state: &AppState) -> CommerceService {
    CommerceService::new(
        state.pool.clone(),
        &state.config.commerce,
        &state.config.catalog,
        &state.settings(),
        state.events.clone(),
    )
}

/// GET /api/v1/plans
pub async fn list_plans(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
) -> Result<Json<Vec<SubscriptionPlan>>, ApiError> {
    let plans = commerce_service(&state).list_plans(&actor).await?;
    Ok(Json(plans))
}

/// POST /api/v1/plans
pub async fn create_plan(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), ApiError> {
    request.validate()?;

    let plan = commerce_service(&state).create_plan(&actor, &request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PATCH /api/v1/plans/:code
pub async fn update_plan(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
    Json(request): Json<UpdatePlanRequest>,
) -> Result<Json<SubscriptionPlan>, ApiError> {
    request.validate()?;

    let plan = commerce_service(&state)
        .update_plan(&actor, &code, &request)
        .await?;
    Ok(Json(plan))
}

/// Starts a subscription, replacing any active one.
///
/// POST /api/v1/plans/:code/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
) -> Result<(StatusCode, Json<UserSubscription>), ApiError> {
    let subscription = commerce_service(&state).subscribe(&actor, &code).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// GET /api/v1/subscriptions/me
pub async fn my_subscription(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<UserSubscription>, ApiError> {
    let subscription = commerce_service(&state)
        .current_subscription(&actor)
        .await?;
    Ok(Json(subscription))
}

/// Dry run of the access policy. Never charges.
///
/// GET /api/v1/prompts/:slug/access
pub async fn check_access(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(slug): Path<String>,
) -> Result<Json<AccessDecision>, ApiError> {
    let decision = commerce_service(&state).can_access(&actor, &slug).await?;
    Ok(Json(decision))
}

/// POST /api/v1/prompts/:slug/unlock
pub async fn unlock(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
) -> Result<Json<UnlockResult>, ApiError> {
    let result = commerce_service(&state).unlock(&actor, &slug).await?;
    Ok(Json(result))
}

/// POST /api/v1/prompts/:slug/purchase
pub async fn purchase(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    body: Option<Json<PurchaseRequest>>,
) -> Result<(StatusCode, Json<Purchase>), ApiError> {
    let Json(request) = body.unwrap_or_default();
    request.validate()?;

    let purchase = commerce_service(&state)
        .purchase(&actor, &slug, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// GET /api/v1/users/me/purchases
pub async fn my_purchases(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PurchaseRecord>>, ApiError> {
    let page = commerce_service(&state)
        .purchases(&actor, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

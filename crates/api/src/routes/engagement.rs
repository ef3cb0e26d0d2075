//! Likes, saves, ratings, comments and reviews.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::engagement::{
    Comment, CommentPage, CommentView, CreateCommentRequest, ListCommentsQuery, RateRequest,
    RatingOutcome, Review, SetCommentStatusRequest, SetLikeRequest, SetSaveRequest,
    ToggleOutcome, WriteReviewRequest,
};
use domain::models::prompt::PromptSummary;
use serde::Deserialize;
use shared::pagination::Page;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentActor, Viewer};
use crate::services::engagement::ReviewOutcome;
use crate::services::EngagementService;

fn engagement_service(state: &AppState) -> EngagementService {
    EngagementService::new(state.pool.clone(), &state.config.catalog, &state.settings())
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Idempotent: repeating the same value leaves the counter alone.
///
/// PUT /api/v1/prompts/:slug/like
pub async fn set_like(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<SetLikeRequest>,
) -> Result<Json<ToggleOutcome>, ApiError> {
    let outcome = engagement_service(&state)
        .set_like(&actor, &slug, request.liked)
        .await?;
    Ok(Json(outcome))
}

/// PUT /api/v1/prompts/:slug/save
pub async fn set_save(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<SetSaveRequest>,
) -> Result<Json<ToggleOutcome>, ApiError> {
    let outcome = engagement_service(&state)
        .set_save(&actor, &slug, request.saved)
        .await?;
    Ok(Json(outcome))
}

/// PUT /api/v1/prompts/:slug/rating
pub async fn rate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<RateRequest>,
) -> Result<Json<RatingOutcome>, ApiError> {
    request.validate()?;

    let outcome = engagement_service(&state)
        .rate(&actor, &slug, request.stars)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/prompts/:slug/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(slug): Path<String>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<CommentPage>, ApiError> {
    let page = engagement_service(&state)
        .list_comments(&actor, &slug, &query)
        .await?;
    Ok(Json(page))
}

/// POST /api/v1/prompts/:slug/comments
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    request.validate()?;

    let comment = engagement_service(&state)
        .add_comment(&actor, &slug, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PATCH /api/v1/comments/:id/status
pub async fn set_comment_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(comment_id): Path<Uuid>,
    Json(request): Json<SetCommentStatusRequest>,
) -> Result<Json<Comment>, ApiError> {
    let comment = engagement_service(&state)
        .set_comment_status(&actor, comment_id, request.status)
        .await?;
    Ok(Json(comment))
}

/// Creates or replaces the caller's review.
///
/// PUT /api/v1/prompts/:slug/review
pub async fn write_review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<WriteReviewRequest>,
) -> Result<Json<ReviewOutcome>, ApiError> {
    request.validate()?;

    let outcome = engagement_service(&state)
        .write_review(&actor, &slug, &request)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/prompts/:slug/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = engagement_service(&state)
        .list_reviews(&actor, &slug, query.page, query.per_page)
        .await?;
    Ok(Json(reviews))
}

/// GET /api/v1/users/me/saved
pub async fn my_saved(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PromptSummary>>, ApiError> {
    let page = engagement_service(&state)
        .saved(&actor, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

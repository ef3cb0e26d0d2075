//! Catalog routes: prompt listing, detail, authoring, status and links.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::engagement::ViewOutcome;
use domain::models::prompt::{
    AttachAiModelRequest, AttachCategoryRequest, CreatePromptRequest, ListPromptsQuery, Prompt,
    PromptDetail, PromptSummary, TransitionStatusRequest, UpdatePromptRequest,
};
use serde::Serialize;
use shared::pagination::Page;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentActor, Viewer};
use crate::services::CatalogService;

pub(crate) fn catalog_service(state: &AppState) -> CatalogService {
    CatalogService::new(
        state.pool.clone(),
        &state.config.catalog,
        &state.settings(),
    )
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub share_count: i32,
}

#[derive(Debug, Serialize)]
pub struct TagLinkResponse {
    pub tag: String,
    pub linked: bool,
    pub usage_count: i32,
}

/// Published prompts for the public; staff and owners can see more through
/// the `status` and `created_by` filters.
///
/// GET /api/v1/prompts
pub async fn list_prompts(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Query(query): Query<ListPromptsQuery>,
) -> Result<Json<Page<PromptSummary>>, ApiError> {
    let page = catalog_service(&state).list(&actor, &query).await?;
    Ok(Json(page))
}

/// Prompt with its links. Premium content is redacted unless the reader
/// has access.
///
/// GET /api/v1/prompts/:slug
pub async fn get_prompt(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(slug): Path<String>,
) -> Result<Json<PromptDetail>, ApiError> {
    let detail = catalog_service(&state).detail(&actor, &slug).await?;
    Ok(Json(detail))
}

/// POST /api/v1/prompts
pub async fn create_prompt(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePromptRequest>,
) -> Result<(StatusCode, Json<Prompt>), ApiError> {
    request.validate()?;

    let prompt = catalog_service(&state).create(&actor, &request).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

/// PATCH /api/v1/prompts/:slug
pub async fn update_prompt(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<UpdatePromptRequest>,
) -> Result<Json<Prompt>, ApiError> {
    request.validate()?;

    let prompt = catalog_service(&state).update(&actor, &slug, &request).await?;
    Ok(Json(prompt))
}

/// Removes the prompt with its content and links. Interactions, comments and
/// purchases go with it.
///
/// DELETE /api/v1/prompts/:slug
pub async fn delete_prompt(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    catalog_service(&state).delete(&actor, &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/prompts/:slug/status
pub async fn transition_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(slug): Path<String>,
    Json(request): Json<TransitionStatusRequest>,
) -> Result<Json<Prompt>, ApiError> {
    let prompt = catalog_service(&state)
        .transition(&actor, &slug, request.status)
        .await?;
    Ok(Json(prompt))
}

/// Counts a view; the per-user counter is only kept for signed-in readers.
///
/// POST /api/v1/prompts/:slug/view
pub async fn record_view(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(slug): Path<String>,
) -> Result<Json<ViewOutcome>, ApiError> {
    let outcome = catalog_service(&state).record_view(&actor, &slug).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/prompts/:slug/share
pub async fn record_share(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
    Path(slug): Path<String>,
) -> Result<Json<ShareResponse>, ApiError> {
    let share_count = catalog_service(&state).record_share(&actor, &slug).await?;
    Ok(Json(ShareResponse { share_count }))
}

async fn link_tag(
    state: &AppState,
    actor: &domain::models::rbac::Actor,
    slug: &str,
    tag_slug: String,
    linked: bool,
) -> Result<Json<TagLinkResponse>, ApiError> {
    let usage_count = catalog_service(state)
        .set_tag(actor, slug, &tag_slug, linked)
        .await?;
    Ok(Json(TagLinkResponse {
        tag: tag_slug,
        linked,
        usage_count,
    }))
}

/// PUT /api/v1/prompts/:slug/tags/:tag_slug
pub async fn attach_tag(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((slug, tag_slug)): Path<(String, String)>,
) -> Result<Json<TagLinkResponse>, ApiError> {
    link_tag(&state, &actor, &slug, tag_slug, true).await
}

/// Detaching a tag that is not linked is a no-op.
///
/// DELETE /api/v1/prompts/:slug/tags/:tag_slug
pub async fn detach_tag(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((slug, tag_slug)): Path<(String, String)>,
) -> Result<Json<TagLinkResponse>, ApiError> {
    link_tag(&state, &actor, &slug, tag_slug, false).await
}

/// PUT /api/v1/prompts/:slug/categories/:code
pub async fn attach_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((slug, code)): Path<(String, String)>,
    body: Option<Json<AttachCategoryRequest>>,
) -> Result<Json<Prompt>, ApiError> {
    let Json(request) = body.unwrap_or_default();
    let prompt = catalog_service(&state)
        .attach_category(&actor, &slug, &code, request.is_primary)
        .await?;
    Ok(Json(prompt))
}

/// DELETE /api/v1/prompts/:slug/categories/:code
pub async fn detach_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((slug, code)): Path<(String, String)>,
) -> Result<Json<Prompt>, ApiError> {
    let prompt = catalog_service(&state)
        .detach_category(&actor, &slug, &code)
        .await?;
    Ok(Json(prompt))
}

/// PUT /api/v1/prompts/:slug/models/:model_id
pub async fn attach_model(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((slug, model_id)): Path<(String, Uuid)>,
    body: Option<Json<AttachAiModelRequest>>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.unwrap_or_default();
    request.validate()?;

    catalog_service(&state)
        .attach_model(&actor, &slug, model_id, &request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/prompts/:slug/models/:model_id
pub async fn detach_model(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((slug, model_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    catalog_service(&state)
        .detach_model(&actor, &slug, model_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

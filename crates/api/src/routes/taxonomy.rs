//! Taxonomy routes: categories, tags, AI platforms and models, sources,
//! levels and authors.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::taxonomy::{
    AiModel, AiPlatform, Category, CategoryNode, CreateAiModelRequest, CreateAiPlatformRequest,
    CreateCategoryRequest, CreatePromptAuthorRequest, CreatePromptLevelRequest,
    CreatePromptSourceRequest, CreateTagRequest, PromptAuthor, PromptLevel, PromptSource, Tag,
    UpdateCategoryRequest,
};
use serde::Deserialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{CurrentActor, Viewer};
use crate::services::TaxonomyService;

fn taxonomy_service(state: &AppState) -> TaxonomyService {
    TaxonomyService::new(state.pool.clone())
}

#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

// ===========================================
// Categories
// ===========================================

/// Category forest ordered by sort order.
///
/// GET /api/v1/categories
pub async fn list_categories(
    State(state): State<AppState>,
    Viewer(actor): Viewer,
) -> Result<Json<Vec<CategoryNode>>, ApiError> {
    Ok(Json(taxonomy_service(&state).category_tree(&actor).await?))
}

/// POST /api/v1/categories
pub async fn create_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    request.validate()?;

    let category = taxonomy_service(&state)
        .create_category(&actor, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/v1/categories/:code
pub async fn update_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    request.validate()?;

    let category = taxonomy_service(&state)
        .update_category(&actor, &code, &request)
        .await?;
    Ok(Json(category))
}

/// Refused while prompts or child categories still reference it.
///
/// DELETE /api/v1/categories/:code
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    taxonomy_service(&state).delete_category(&actor, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===========================================
// Tags
// ===========================================

/// GET /api/v1/tags?q=&limit=
pub async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = taxonomy_service(&state)
        .list_tags(query.q.as_deref(), query.limit)
        .await?;
    Ok(Json(tags))
}

/// POST /api/v1/tags
pub async fn create_tag(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    request.validate()?;

    let tag = taxonomy_service(&state).create_tag(&actor, &request).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

// ===========================================
// AI platforms and models
// ===========================================

/// GET /api/v1/platforms
pub async fn list_platforms(
    State(state): State<AppState>,
) -> Result<Json<Vec<AiPlatform>>, ApiError> {
    Ok(Json(taxonomy_service(&state).list_platforms().await?))
}

/// POST /api/v1/platforms
pub async fn create_platform(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreateAiPlatformRequest>,
) -> Result<(StatusCode, Json<AiPlatform>), ApiError> {
    request.validate()?;

    let platform = taxonomy_service(&state)
        .create_platform(&actor, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(platform)))
}

/// GET /api/v1/platforms/:code/models
pub async fn list_models(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<AiModel>>, ApiError> {
    Ok(Json(taxonomy_service(&state).list_models(&code).await?))
}

/// POST /api/v1/platforms/:code/models
pub async fn create_model(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
    Json(request): Json<CreateAiModelRequest>,
) -> Result<(StatusCode, Json<AiModel>), ApiError> {
    request.validate()?;

    let model = taxonomy_service(&state)
        .create_model(&actor, &code, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(model)))
}

// ===========================================
// Sources, levels and authors
// ===========================================

/// GET /api/v1/sources
pub async fn list_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromptSource>>, ApiError> {
    Ok(Json(taxonomy_service(&state).list_sources().await?))
}

/// POST /api/v1/sources
pub async fn create_source(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePromptSourceRequest>,
) -> Result<(StatusCode, Json<PromptSource>), ApiError> {
    request.validate()?;

    let source = taxonomy_service(&state)
        .create_source(&actor, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// GET /api/v1/levels
pub async fn list_levels(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromptLevel>>, ApiError> {
    Ok(Json(taxonomy_service(&state).list_levels().await?))
}

/// POST /api/v1/levels
pub async fn create_level(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePromptLevelRequest>,
) -> Result<(StatusCode, Json<PromptLevel>), ApiError> {
    request.validate()?;

    let level = taxonomy_service(&state).create_level(&actor, &request).await?;
    Ok((StatusCode::CREATED, Json(level)))
}

/// GET /api/v1/authors
pub async fn list_authors(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromptAuthor>>, ApiError> {
    Ok(Json(taxonomy_service(&state).list_authors().await?))
}

/// POST /api/v1/authors
pub async fn create_author(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePromptAuthorRequest>,
) -> Result<(StatusCode, Json<PromptAuthor>), ApiError> {
    request.validate()?;

    let author = taxonomy_service(&state)
        .create_author(&actor, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(author)))
}

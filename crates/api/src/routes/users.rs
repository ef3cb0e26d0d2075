//! Current-user profile routes.

use axum::{extract::State, Json};
use domain::models::user::{UpdateProfileRequest, UserProfile};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;
use crate::routes::auth::auth_service;

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = auth_service(&state).profile(auth.user_id).await?;
    Ok(Json(profile))
}

/// Partial update; absent fields are left unchanged.
///
/// PATCH /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    request.validate()?;

    let profile = auth_service(&state)
        .update_profile(auth.user_id, &request)
        .await?;
    Ok(Json(profile))
}

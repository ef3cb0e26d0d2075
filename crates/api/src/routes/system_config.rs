//! Runtime settings backed by the `system_config` table.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::system_config::{ConfigEntryView, SetConfigRequest};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentActor;
use crate::services::ConfigService;

fn config_service(state: &AppState) -> ConfigService {
    ConfigService::new(state.pool.clone(), state.config_store.clone())
}

/// Entries flagged public. No authentication.
///
/// GET /api/v1/config/public
pub async fn list_public(State(state): State<AppState>) -> Json<Vec<ConfigEntryView>> {
    Json(config_service(&state).public_entries())
}

/// GET /api/v1/config
pub async fn list_all(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<ConfigEntryView>>, ApiError> {
    Ok(Json(config_service(&state).all_entries(&actor)?))
}

/// The new value applies to requests started after the write.
///
/// PUT /api/v1/config/:key
pub async fn set_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(key): Path<String>,
    Json(request): Json<SetConfigRequest>,
) -> Result<Json<ConfigEntryView>, ApiError> {
    request.validate()?;

    let entry = config_service(&state).set(&actor, &key, &request).await?;
    Ok(Json(entry))
}

//! Role and permission administration. Every route needs `rbac.manage`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::rbac::{
    CreatePermissionRequest, CreateRoleRequest, GrantRequest, Permission, Role, RolePermission,
    UpdatePermissionRequest, UpdateRoleRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentActor;
use crate::services::RbacService;

fn rbac_service(state: &AppState) -> RbacService {
    RbacService::new(state.pool.clone())
}

/// GET /api/v1/roles
pub async fn list_roles(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(rbac_service(&state).list_roles(&actor).await?))
}

/// POST /api/v1/roles
pub async fn create_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    request.validate()?;

    let role = rbac_service(&state).create_role(&actor, &request).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// PATCH /api/v1/roles/:code
pub async fn update_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<Role>, ApiError> {
    request.validate()?;

    let role = rbac_service(&state)
        .update_role(&actor, &code, &request)
        .await?;
    Ok(Json(role))
}

/// GET /api/v1/roles/:code/grants
pub async fn list_grants(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
) -> Result<Json<Vec<RolePermission>>, ApiError> {
    Ok(Json(rbac_service(&state).list_grants(&actor, &code).await?))
}

/// Creates or replaces the grant's CRUD flags.
///
/// PUT /api/v1/roles/:code/grants/:permission_code
pub async fn set_grant(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((code, permission_code)): Path<(String, String)>,
    Json(request): Json<GrantRequest>,
) -> Result<Json<RolePermission>, ApiError> {
    let grant = rbac_service(&state)
        .set_grant(&actor, &code, &permission_code, request.into())
        .await?;
    Ok(Json(grant))
}

/// DELETE /api/v1/roles/:code/grants/:permission_code
pub async fn revoke_grant(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((code, permission_code)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    rbac_service(&state)
        .revoke_grant(&actor, &code, &permission_code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Permission>>, ApiError> {
    Ok(Json(rbac_service(&state).list_permissions(&actor).await?))
}

/// POST /api/v1/permissions
pub async fn create_permission(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    request.validate()?;

    let permission = rbac_service(&state)
        .create_permission(&actor, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// PATCH /api/v1/permissions/:code
pub async fn update_permission(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(code): Path<String>,
    Json(request): Json<UpdatePermissionRequest>,
) -> Result<Json<Permission>, ApiError> {
    request.validate()?;

    let permission = rbac_service(&state)
        .update_permission(&actor, &code, &request)
        .await?;
    Ok(Json(permission))
}

/// PUT /api/v1/users/:id/roles/:role_code
pub async fn assign_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((user_id, role_code)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    rbac_service(&state)
        .assign_role(&actor, user_id, &role_code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/users/:id/roles/:role_code
pub async fn remove_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((user_id, role_code)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    rbac_service(&state)
        .remove_role(&actor, user_id, &role_code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

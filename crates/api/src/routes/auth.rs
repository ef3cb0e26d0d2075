//! Authentication routes: registration, login and token refresh.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::user::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenPair,
};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::AuthService;

pub(crate) fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.pool.clone(),
        state.jwt.clone(),
        state.events.clone(),
        state.settings(),
    )
}

/// Register a new account and sign it in.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let response = auth_service(&state).register(&request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sign in with username or email.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    request.validate()?;

    let response = auth_service(&state).login(&request).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair.
///
/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    request.validate()?;

    let tokens = auth_service(&state).refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        serde_json::from_value(serde_json::json!({
            "username": "minh_anh",
            "email": "minh@example.com",
            "password": "correct-horse-battery",
            "password_confirm": "correct-horse-battery",
        }))
        .unwrap()
    }

    #[test]
    fn test_register_request_validation() {
        assert!(register_request().validate().is_ok());
    }

    #[test]
    fn test_register_request_invalid_email() {
        let mut request = register_request();
        request.email = "not-an-email".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_short_password() {
        let mut request = register_request();
        request.password = "short".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_login_request_requires_both_fields() {
        let request: LoginRequest =
            serde_json::from_value(serde_json::json!({"login": "", "password": ""})).unwrap();
        let errors = request.validate().unwrap_err();
        let api: ApiError = errors.into();
        assert!(matches!(api, ApiError::InvalidFields { ref details, .. } if details.len() == 2));
    }
}

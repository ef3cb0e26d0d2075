//! Bearer-token authentication.
//!
//! `require_user_auth` rejects requests without a valid access token;
//! `optional_user_auth` only annotates the request when one is present.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::jwt::{extract_user_id, JwtConfig};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Identity proven by a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuth {
    pub user_id: Uuid,
    /// Token id, logged for session correlation.
    pub jti: String,
}

impl UserAuth {
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Self, String> {
        let claims = jwt
            .validate_access_token(token)
            .map_err(|e| format!("Invalid token: {}", e))?;
        let user_id = extract_user_id(&claims).map_err(|e| e.to_string())?;

        Ok(UserAuth {
            user_id,
            jti: claims.jti,
        })
    }

    /// Validates the bearer token in `headers`, if any.
    pub fn from_headers(jwt: &JwtConfig, headers: &HeaderMap) -> Option<Result<Self, String>> {
        bearer_token(headers).map(|token| Self::validate(jwt, token))
    }
}

/// The token after `Bearer `, when the header has that shape.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match UserAuth::from_headers(&state.jwt, req.headers()) {
        Some(Ok(auth)) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Some(Err(reason)) => {
            tracing::debug!(reason = %reason, "Access token rejected");
            ApiError::Unauthorized("Invalid or expired token".into()).into_response()
        }
        None => ApiError::Unauthorized("Missing or invalid Authorization header".into())
            .into_response(),
    }
}

/// Annotates the request when a valid token is present. An invalid token is
/// treated as anonymous rather than rejected.
pub async fn optional_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(Ok(auth)) = UserAuth::from_headers(&state.jwt, req.headers()) {
        req.extensions_mut().insert(auth);
    }
    next.run(req).await
}

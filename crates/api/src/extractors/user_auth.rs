//! Bearer-token extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;

/// Reuses the identity stored by the auth middleware, otherwise validates
/// the bearer token itself.
#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        match UserAuth::from_headers(&state.jwt, &parts.headers) {
            Some(Ok(auth)) => Ok(auth),
            Some(Err(reason)) => {
                tracing::debug!(reason = %reason, "Access token rejected");
                Err(ApiError::Unauthorized("Invalid or expired token".into()))
            }
            None => Err(ApiError::Unauthorized(
                "Missing or invalid Authorization header".into(),
            )),
        }
    }
}

/// `None` for anonymous requests. A malformed or expired token is rejected so
/// clients notice they need to refresh.
#[derive(Debug, Clone)]
pub struct OptionalUserAuth(pub Option<UserAuth>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(OptionalUserAuth(Some(auth.clone())));
        }

        match UserAuth::from_headers(&state.jwt, &parts.headers) {
            None => Ok(OptionalUserAuth(None)),
            Some(Ok(auth)) => Ok(OptionalUserAuth(Some(auth))),
            Some(Err(_)) => Err(ApiError::Unauthorized("Invalid or expired token".into())),
        }
    }
}

//! Actor extractors: the caller's roles and grants resolved per request.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::rbac::Actor;

use super::user_auth::OptionalUserAuth;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::UserAuth;
use crate::services::ActorLoader;

/// Authenticated caller. Requests without a valid token get 401.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = UserAuth::from_request_parts(parts, state).await?;
        let actor = ActorLoader::new(state.pool.clone()).load(auth.user_id).await?;
        tracing::Span::current().record("user_id", tracing::field::display(actor.user_id));
        Ok(CurrentActor(actor))
    }
}

/// Authenticated caller when a token is present, the guest actor otherwise.
#[derive(Debug, Clone)]
pub struct Viewer(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let OptionalUserAuth(auth) = OptionalUserAuth::from_request_parts(parts, state).await?;
        let loader = ActorLoader::new(state.pool.clone());
        let actor = match auth {
            Some(auth) => loader.load(auth.user_id).await?,
            None => loader.guest().await?,
        };
        Ok(Viewer(actor))
    }
}

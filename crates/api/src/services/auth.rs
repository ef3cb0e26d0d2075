//! Registration, login, token refresh and profile management.

use chrono::Utc;
use domain::models::rbac::roles;
use domain::models::system_config::{keys, ConfigSnapshot};
use domain::models::user::{
    AuthResponse, LoginRequest, RegisterRequest, TokenPair, UpdateProfileRequest, User,
    UserProfile,
};
use domain::services::{CatalogEvent, EventPublisher};
use domain::DomainError;
use persistence::repositories::{NewUser, RbacRepository, UserRepository};
use shared::jwt::{extract_user_id, JwtConfig, JwtError};
use shared::password::{hash_password, validate_password_strength, verify_password, PasswordError};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::metrics::record_registration;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Registration is closed")]
    RegistrationClosed,

    /// Unknown login, inactive account and wrong password all map here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken | AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::RegistrationClosed => ApiError::Forbidden(err.to_string()),
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid username/email or password".into())
            }
            AuthError::InvalidRefreshToken => {
                ApiError::Unauthorized("Invalid or expired refresh token".into())
            }
            AuthError::UserNotFound => ApiError::NotFound("User not found".into()),
            AuthError::Domain(e) => e.into(),
            AuthError::Password(e) => e.into(),
            AuthError::Token(e) => ApiError::Internal(format!("Token error: {}", e)),
            AuthError::Database(e) => e.into(),
        }
    }
}

pub struct AuthService {
    users: UserRepository,
    rbac: RbacRepository,
    jwt: Arc<JwtConfig>,
    events: Arc<dyn EventPublisher>,
    settings: Arc<ConfigSnapshot>,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        jwt: Arc<JwtConfig>,
        events: Arc<dyn EventPublisher>,
        settings: Arc<ConfigSnapshot>,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            rbac: RbacRepository::new(pool),
            jwt,
            events,
            settings,
        }
    }

    /// Creates a MEMBER account and signs it in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        if !self.settings.get_bool(keys::REGISTRATION_OPEN, true) {
            return Err(AuthError::RegistrationClosed);
        }
        request.check_passwords_match()?;
        validate_password_strength(&request.password)?;

        let email = request.normalized_email();
        let username = request.username.trim();

        let (username_taken, email_taken) = self.users.find_taken(username, &email).await?;
        if username_taken {
            return Err(AuthError::UsernameTaken);
        }
        if email_taken {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&request.password)?;
        let entity = self
            .users
            .create_user(
                NewUser {
                    username,
                    email: &email,
                    password_hash: &password_hash,
                    first_name: request.first_name.as_deref(),
                    last_name: request.last_name.as_deref(),
                    phone: request.phone.as_deref(),
                },
                roles::MEMBER,
            )
            .await
            .map_err(|e| match &e {
                // Lost a race with a concurrent registration.
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    AuthError::UsernameTaken
                }
                _ => AuthError::Database(e),
            })?;
        let user: User = entity.into();

        record_registration();
        self.events.publish(CatalogEvent::UserCreated {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            occurred_at: user.created_at,
        });
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        let tokens = self.issue_tokens(user.id)?;
        let profile = UserProfile::new(user, vec![roles::MEMBER.to_string()]);
        Ok(AuthResponse {
            user: profile,
            tokens,
        })
    }

    /// Verifies a login and password pair. Every failure is the same error.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<User, AuthError> {
        let Some(entity) = self.users.find_by_login(login).await? else {
            tracing::debug!("Login for unknown account");
            return Err(AuthError::InvalidCredentials);
        };
        let user: User = entity.into();

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Login for inactive account");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self.authenticate(&request.login, &request.password).await?;
        self.users.update_last_login(user.id, Utc::now()).await?;

        let tokens = self.issue_tokens(user.id)?;
        let roles = self.role_codes(user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            user: UserProfile::new(user, roles),
            tokens,
        })
    }

    /// Exchanges a valid refresh token for a new pair. Tokens are stateless,
    /// so the account is re-checked here.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        let user_id = extract_user_id(&claims).map_err(|_| AuthError::InvalidRefreshToken)?;

        match self.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => self.issue_tokens(user_id),
            _ => Err(AuthError::InvalidRefreshToken),
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        let user: User = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?
            .into();
        let roles = self.role_codes(user_id).await?;
        Ok(UserProfile::new(user, roles))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile, AuthError> {
        if request.is_empty() {
            return self.profile(user_id).await;
        }
        request.check_date_of_birth(Utc::now().date_naive())?;

        let user: User = self
            .users
            .update_profile(user_id, request)
            .await?
            .ok_or(AuthError::UserNotFound)?
            .into();
        let roles = self.role_codes(user_id).await?;
        Ok(UserProfile::new(user, roles))
    }

    async fn role_codes(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        Ok(self
            .rbac
            .roles_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.code)
            .collect())
    }

    fn issue_tokens(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access = self.jwt.generate_access_token(user_id)?;
        let refresh = self.jwt.generate_refresh_token(user_id)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer",
            expires_in: access.expires_in,
        })
    }
}

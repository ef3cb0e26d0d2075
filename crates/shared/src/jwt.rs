//! JWT token utilities (HS256).
//!
//! Access tokens authenticate API calls; refresh tokens only mint new access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Minimum secret length accepted for HMAC signing.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default leeway in seconds for clock skew tolerance.
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),
}

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique token identifier
    pub jti: String,
    pub token_type: TokenType,
}

/// Type of JWT token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// A freshly minted token and its identifier.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_in: i64,
}

/// Signing keys and lifetimes for token issue and validation.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    pub access_token_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl JwtConfig {
    /// Builds a config from a shared HMAC secret.
    pub fn new(
        secret: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::InvalidSecret(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry_secs,
            refresh_token_expiry_secs,
            leeway_secs,
        })
    }

    pub fn generate_access_token(&self, user_id: Uuid) -> Result<IssuedToken, JwtError> {
        self.generate_token(user_id, TokenType::Access, self.access_token_expiry_secs)
    }

    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<IssuedToken, JwtError> {
        self.generate_token(user_id, TokenType::Refresh, self.refresh_token_expiry_secs)
    }

    fn generate_token(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        expiry_secs: i64,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            expires_in: expiry_secs,
        })
    }

    /// Validates signature and expiry, returning the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Extracts the user id from validated claims.
pub fn extract_user_id(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-that-is-long-enough-123";

    fn config() -> JwtConfig {
        JwtConfig::new(SECRET, 900, 604800, 0).unwrap()
    }

    #[test]
    fn test_rejects_short_secret() {
        let result = JwtConfig::new("too-short", 900, 604800, 0);
        assert!(matches!(result, Err(JwtError::InvalidSecret(_))));
    }

    #[test]
    fn test_access_token_round_trip() {
        let cfg = config();
        let user_id = Uuid::new_v4();

        let issued = cfg.generate_access_token(user_id).unwrap();
        let claims = cfg.validate_access_token(&issued.token).unwrap();

        assert_eq!(extract_user_id(&claims).unwrap(), user_id);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(issued.expires_in, 900);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let cfg = config();
        let issued = cfg.generate_refresh_token(Uuid::new_v4()).unwrap();

        assert!(cfg.validate_refresh_token(&issued.token).is_ok());
        assert!(matches!(
            cfg.validate_access_token(&issued.token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut cfg = config();
        cfg.access_token_expiry_secs = -120;
        let issued = cfg.generate_access_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            cfg.validate_access_token(&issued.token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let other = JwtConfig::new("another-secret-that-is-also-long-enough", 900, 900, 0).unwrap();
        let issued = other.generate_access_token(Uuid::new_v4()).unwrap();

        assert!(matches!(
            config().validate_access_token(&issued.token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(config().validate_token("not.a.jwt").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", config());
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(SECRET));
    }
}

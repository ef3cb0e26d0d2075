//! Domain error taxonomy.

use thiserror::Error;

/// Result alias used by domain rules and the service layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised by catalog operations. None of them leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Bad input shape or constraint violation.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// RBAC check failed.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Unique-constraint race; retry as an update.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already owned: {0}")]
    AlreadyOwned(String),

    /// Delete refused because other rows still reference the entity.
    #[error("Referential integrity: {0}")]
    ReferentialIntegrity(String),

    /// Parent link is on another prompt, or would close a cycle.
    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Insufficient tickets: need {required}, have {available}")]
    InsufficientTickets { required: i32, available: i32 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        DomainError::PermissionDenied(msg.into())
    }

    /// Whether the caller may retry the same request and expect a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            DomainError::validation("slug taken").to_string(),
            "Validation error: slug taken"
        );
        assert_eq!(
            DomainError::InsufficientTickets {
                required: 5,
                available: 2
            }
            .to_string(),
            "Insufficient tickets: need 5, have 2"
        );
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(DomainError::Conflict("race".into()).is_retryable());
        assert!(!DomainError::AlreadyOwned("x".into()).is_retryable());
        assert!(!DomainError::denied("no").is_retryable());
    }
}

//! Repository error type.
//!
//! Plain lookups return `sqlx::Error`. Operations that enforce business rules
//! inside a transaction can also fail with a [`DomainError`].

use domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        RepositoryError::Domain(DomainError::not_found(msg))
    }

    /// Maps constraint violations raised by an insert or update.
    ///
    /// Unique keys become `Conflict`, dangling references `NotFound` and
    /// failed checks `Validation`.
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        match sqlstate(&err).as_deref() {
            Some(UNIQUE_VIOLATION) => {
                tracing::warn!(entity = what, error = %err, "Unique constraint violated");
                DomainError::Conflict(format!("{what} already exists")).into()
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                DomainError::not_found(format!("Referenced row for {what}")).into()
            }
            Some(CHECK_VIOLATION) => {
                DomainError::validation(format!("Invalid value for {what}")).into()
            }
            _ => RepositoryError::Database(err),
        }
    }

    /// Maps a foreign key violation raised by a delete to `ReferentialIntegrity`.
    pub fn from_delete(err: sqlx::Error, what: &str) -> Self {
        match sqlstate(&err).as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                tracing::warn!(entity = what, error = %err, "Delete blocked by references");
                DomainError::ReferentialIntegrity(format!("{what} is still referenced")).into()
            }
            _ => RepositoryError::Database(err),
        }
    }
}

/// PostgreSQL SQLSTATE of a database error, if any.
pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub const UNIQUE_VIOLATION: &str = "23505";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
pub const CHECK_VIOLATION: &str = "23514";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_passthrough() {
        let err: RepositoryError = DomainError::AlreadyOwned("prompt".into()).into();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::AlreadyOwned(_))
        ));
        assert_eq!(err.to_string(), "Already owned: prompt");
    }

    #[test]
    fn test_sqlstate_of_non_database_error() {
        assert_eq!(sqlstate(&sqlx::Error::RowNotFound), None);
    }

    #[test]
    fn test_non_constraint_errors_stay_database() {
        assert!(matches!(
            RepositoryError::from_write(sqlx::Error::RowNotFound, "tag"),
            RepositoryError::Database(_)
        ));
        assert!(matches!(
            RepositoryError::from_delete(sqlx::Error::PoolTimedOut, "tag"),
            RepositoryError::Database(_)
        ));
    }
}

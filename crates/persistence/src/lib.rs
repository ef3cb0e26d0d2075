//! Persistence layer for the PromptHub catalog.
//!
//! This crate contains:
//! - Database connection management and query metrics
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the transactional counter and
//!   ledger operations
//! - SQL migrations under `src/migrations`

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

pub use error::{RepositoryError, RepositoryResult};

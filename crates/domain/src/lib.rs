//! Domain layer for the PromptHub catalog.
//!
//! This crate contains:
//! - Domain models (users, RBAC, taxonomy, prompts, commerce, engagement, system config)
//! - Pure business rules (authorization, status machine, rating aggregate, access policy)
//! - Domain events and the error taxonomy shared by every layer above

pub mod error;
pub mod models;
pub mod services;

pub use error::{DomainError, DomainResult};

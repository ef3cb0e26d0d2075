//! Shared utilities and common types for the PromptHub backend.
//!
//! This crate provides functionality used across all other crates:
//! - Password hashing with Argon2id
//! - JWT access/refresh tokens
//! - Input validation helpers (slugs, codes, ratings)
//! - Page-number and keyset pagination
//! - Transaction id generation

pub mod jwt;
pub mod pagination;
pub mod password;
pub mod transaction;
pub mod validation;

//! HTTP route handlers.

pub mod auth;
pub mod commerce;
pub mod dashboard;
pub mod engagement;
pub mod health;
pub mod prompts;
pub mod rbac;
pub mod system_config;
pub mod taxonomy;
pub mod users;

//! Custom extractors for authentication and authorization.

pub mod actor;
pub mod user_auth;

pub use actor::{CurrentActor, Viewer};
pub use user_auth::OptionalUserAuth;

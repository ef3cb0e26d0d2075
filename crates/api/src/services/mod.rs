//! Application services between the HTTP routes and the repositories.

pub mod admin_bootstrap;
pub mod auth;
pub mod authorization;
pub mod catalog;
pub mod commerce;
pub mod config_store;
pub mod engagement;
pub mod events;
pub mod taxonomy;

pub use auth::AuthService;
pub use authorization::{ActorLoader, RbacService};
pub use catalog::CatalogService;
pub use commerce::CommerceService;
pub use config_store::{ConfigService, ConfigStore};
pub use engagement::EngagementService;
pub use taxonomy::TaxonomyService;

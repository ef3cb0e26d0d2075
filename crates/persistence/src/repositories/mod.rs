//! Repository implementations for database operations.

pub mod ai;
pub mod category;
pub mod comment;
pub mod commerce;
pub mod dashboard;
pub mod interaction;
pub mod prompt;
pub mod rbac;
pub mod reconciliation;
pub mod reference;
pub mod review;
pub mod seed;
pub mod system_config;
pub mod tag;
pub mod user;

pub use ai::AiCatalogRepository;
pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use commerce::{CommerceRepository, PromptAccessFacts};
pub use dashboard::DashboardRepository;
pub use interaction::InteractionRepository;
pub use prompt::{NewPrompt, PromptRepository};
pub use rbac::RbacRepository;
pub use reconciliation::{ReconcileReport, ReconciliationRepository};
pub use reference::ReferenceRepository;
pub use review::ReviewRepository;
pub use seed::{SeedData, SeedReport, SeedRepository};
pub use system_config::{ConfigWrite, SystemConfigRepository};
pub use tag::TagRepository;
pub use user::{NewUser, UserRepository};

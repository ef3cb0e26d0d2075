//! Domain models for PromptHub.

pub mod commerce;
pub mod dashboard;
pub mod engagement;
pub mod prompt;
pub mod rbac;
pub mod system_config;
pub mod taxonomy;
pub mod user;

pub use commerce::{
    AccessDecision, AccessReason, Purchase, SubscriptionPlan, SubscriptionStatus, UserSubscription,
};
pub use engagement::{Comment, CommentStatus, Review, UserPromptInteraction};
pub use prompt::{Prompt, PromptContent, PromptDetail, PromptStatus, PromptSummary};
pub use rbac::{Actor, CrudAction, CrudFlags, GrantSet, Permission, Role};
pub use system_config::{ConfigSnapshot, ConfigType, SystemConfigEntry};
pub use taxonomy::{AiModel, AiPlatform, Category, Tag};
pub use user::User;

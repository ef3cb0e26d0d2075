//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod commerce;
pub mod engagement;
pub mod prompt;
pub mod rbac;
pub mod system_config;
pub mod taxonomy;
pub mod user;

pub use commerce::{
    PlanTypeDb, PurchaseEntity, PurchaseRecordEntity, SubscriptionPlanEntity,
    SubscriptionStatusDb, UserSubscriptionEntity,
};
pub use engagement::{
    CommentEntity, CommentStatusDb, CommentWithAuthorEntity, InteractionEntity, ReviewEntity,
};
pub use prompt::{
    PromptCategoryLinkEntity, PromptContentEntity, PromptEntity, PromptModelLinkEntity,
    PromptStatusDb, PROMPT_COLUMNS,
};
pub use rbac::{EffectiveGrantEntity, GrantEntity, PermissionEntity, RoleEntity};
pub use system_config::{ConfigTypeDb, SystemConfigEntity};
pub use taxonomy::{
    AiModelEntity, AiPlatformEntity, CategoryEntity, PromptAuthorEntity, PromptLevelEntity,
    PromptSourceEntity, SourceTypeDb, TagEntity,
};
pub use user::UserEntity;

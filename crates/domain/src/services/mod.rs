//! Domain services for PromptHub.
//!
//! Pure business rules over domain models; persistence and transport live elsewhere.

pub mod access;
pub mod authorization;
pub mod events;
pub mod hierarchy;
pub mod interaction;
pub mod rating;
pub mod status;

pub use access::{evaluate_access, AccessInput};
pub use authorization::{authorize, ensure, ensure_level, is_staff, requires_level};
pub use events::{
    CatalogEvent, ChannelEventPublisher, EventHandler, EventPublisher, LoggingEventHandler,
    LoggingEventPublisher, PublishOutcome,
};
pub use hierarchy::{check_parent, would_create_cycle};
pub use interaction::{apply_delta, flag_delta, ToggleKind};
pub use rating::RatingAggregate;
pub use status::{authorize_transition, published_at_after, TransitionKind};

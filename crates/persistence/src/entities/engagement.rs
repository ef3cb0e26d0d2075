//! Engagement entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::engagement::{Comment, CommentStatus, Review, UserPromptInteraction};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for comment_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "comment_status", rename_all = "snake_case")]
pub enum CommentStatusDb {
    Visible,
    Hidden,
    Deleted,
}

impl From<CommentStatusDb> for CommentStatus {
    fn from(db: CommentStatusDb) -> Self {
        match db {
            CommentStatusDb::Visible => Self::Visible,
            CommentStatusDb::Hidden => Self::Hidden,
            CommentStatusDb::Deleted => Self::Deleted,
        }
    }
}

impl From<CommentStatus> for CommentStatusDb {
    fn from(domain: CommentStatus) -> Self {
        match domain {
            CommentStatus::Visible => Self::Visible,
            CommentStatus::Hidden => Self::Hidden,
            CommentStatus::Deleted => Self::Deleted,
        }
    }
}

/// Database row mapping for the user_prompt_interactions table.
#[derive(Debug, Clone, FromRow)]
pub struct InteractionEntity {
    pub user_id: Uuid,
    pub prompt_id: Uuid,
    pub is_liked: bool,
    pub is_saved: bool,
    pub rating: Option<i16>,
    pub view_count: i32,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub liked_at: Option<DateTime<Utc>>,
    pub saved_at: Option<DateTime<Utc>>,
    pub rated_at: Option<DateTime<Utc>>,
}

impl From<InteractionEntity> for UserPromptInteraction {
    fn from(entity: InteractionEntity) -> Self {
        Self {
            user_id: entity.user_id,
            prompt_id: entity.prompt_id,
            is_liked: entity.is_liked,
            is_saved: entity.is_saved,
            rating: entity.rating,
            view_count: entity.view_count,
            last_viewed_at: entity.last_viewed_at,
            liked_at: entity.liked_at,
            saved_at: entity.saved_at,
            rated_at: entity.rated_at,
        }
    }
}

/// Database row mapping for the comments table.
#[derive(Debug, Clone, FromRow)]
pub struct CommentEntity {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
    pub status: CommentStatusDb,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentEntity> for Comment {
    fn from(entity: CommentEntity) -> Self {
        Self {
            id: entity.id,
            prompt_id: entity.prompt_id,
            user_id: entity.user_id,
            parent_id: entity.parent_id,
            text: entity.text,
            status: entity.status.into(),
            like_count: entity.like_count,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Comment row joined with the author's username.
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthorEntity {
    #[sqlx(flatten)]
    pub comment: CommentEntity,
    pub username: String,
}

/// Database row mapping for the reviews table.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewEntity {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewEntity> for Review {
    fn from(entity: ReviewEntity) -> Self {
        Self {
            id: entity.id,
            prompt_id: entity.prompt_id,
            user_id: entity.user_id,
            rating: entity.rating,
            comment: entity.comment,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_status_round_trip() {
        for status in [
            CommentStatus::Visible,
            CommentStatus::Hidden,
            CommentStatus::Deleted,
        ] {
            let db: CommentStatusDb = status.into();
            assert_eq!(CommentStatus::from(db), status);
        }
    }

    #[test]
    fn test_interaction_entity_into_domain() {
        let entity = InteractionEntity {
            user_id: Uuid::new_v4(),
            prompt_id: Uuid::new_v4(),
            is_liked: true,
            is_saved: false,
            rating: Some(4),
            view_count: 3,
            last_viewed_at: Some(Utc::now()),
            liked_at: Some(Utc::now()),
            saved_at: None,
            rated_at: Some(Utc::now()),
        };
        let interaction: UserPromptInteraction = entity.into();
        assert!(interaction.is_liked);
        assert_eq!(interaction.rating, Some(4));
    }
}

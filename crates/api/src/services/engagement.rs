//! Likes, saves, ratings, comments and reviews.

use domain::models::engagement::{
    Comment, CommentPage, CommentStatus, CommentView, CreateCommentRequest, ListCommentsQuery,
    RatingOutcome, Review, ToggleOutcome, WriteReviewRequest,
};
use domain::models::prompt::{Prompt, PromptSummary};
use domain::models::rbac::{codes, Actor, CrudAction};
use domain::models::system_config::ConfigSnapshot;
use domain::services::{authorize, ensure, ToggleKind};
use domain::DomainError;
use persistence::repositories::{CommentRepository, InteractionRepository, ReviewRepository};
use serde::Serialize;
use shared::pagination::{decode_cursor, encode_cursor, Page, PageRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::catalog::CatalogService;

pub const DEFAULT_COMMENT_LIMIT: u32 = 20;
pub const MAX_COMMENT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub review: Review,
    pub rating: RatingOutcome,
}

pub struct EngagementService {
    catalog: CatalogService,
    interactions: InteractionRepository,
    comments: CommentRepository,
    reviews: ReviewRepository,
    max_page_size: u32,
}

impl EngagementService {
    pub fn new(pool: PgPool, catalog: &CatalogConfig, settings: &ConfigSnapshot) -> Self {
        Self {
            catalog: CatalogService::new(pool.clone(), catalog, settings),
            interactions: InteractionRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            reviews: ReviewRepository::new(pool),
            max_page_size: catalog.max_page_size,
        }
    }

    async fn prompt(&self, actor: &Actor, slug: &str) -> ApiResult<Prompt> {
        self.catalog.find_visible(actor, slug).await
    }

    pub async fn set_like(&self, actor: &Actor, slug: &str, liked: bool) -> ApiResult<ToggleOutcome> {
        self.toggle(actor, slug, ToggleKind::Like, liked).await
    }

    pub async fn set_save(&self, actor: &Actor, slug: &str, saved: bool) -> ApiResult<ToggleOutcome> {
        self.toggle(actor, slug, ToggleKind::Save, saved).await
    }

    async fn toggle(
        &self,
        actor: &Actor,
        slug: &str,
        kind: ToggleKind,
        value: bool,
    ) -> ApiResult<ToggleOutcome> {
        let prompt = self.prompt(actor, slug).await?;
        Ok(self
            .interactions
            .set_flag(actor.user_id, prompt.id, kind, value)
            .await?)
    }

    pub async fn rate(&self, actor: &Actor, slug: &str, stars: i16) -> ApiResult<RatingOutcome> {
        shared::validation::validate_rating(stars)
            .map_err(|_| ApiError::Validation("Rating must be between 1 and 5".into()))?;
        let prompt = self.prompt(actor, slug).await?;
        Ok(self.interactions.rate(actor.user_id, prompt.id, stars).await?)
    }

    // ===========================================
    // Comments
    // ===========================================

    pub async fn add_comment(
        &self,
        actor: &Actor,
        slug: &str,
        request: &CreateCommentRequest,
    ) -> ApiResult<CommentView> {
        let prompt = self.prompt(actor, slug).await?;
        let comment: Comment = self
            .comments
            .create(prompt.id, actor.user_id, request.text.trim(), request.parent_id)
            .await?
            .into();
        Ok(CommentView::new(comment, actor.username.clone()))
    }

    /// Moderators may set any status. Authors may only delete their own.
    pub async fn set_comment_status(
        &self,
        actor: &Actor,
        comment_id: Uuid,
        status: CommentStatus,
    ) -> ApiResult<Comment> {
        let current: Comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .map(Comment::from)
            .ok_or_else(|| DomainError::not_found("Comment"))?;

        let self_delete = status == CommentStatus::Deleted && current.user_id == actor.user_id;
        if !self_delete {
            ensure(actor, codes::COMMENT_MODERATE, CrudAction::Update, None)?;
        }

        let updated: Comment = self.comments.set_status(comment_id, status).await?.into();
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            comment_id = %comment_id,
            from = %current.status,
            to = %status,
            "Comment status changed"
        );
        Ok(updated)
    }

    /// Keyset page over (created_at, id). Hidden comments only show to moderators.
    pub async fn list_comments(
        &self,
        actor: &Actor,
        slug: &str,
        query: &ListCommentsQuery,
    ) -> ApiResult<CommentPage> {
        let prompt = self.prompt(actor, slug).await?;
        let after = query.cursor.as_deref().map(decode_cursor).transpose()?;
        let limit = comment_limit(query.limit);
        let include_hidden = authorize(actor, codes::COMMENT_MODERATE, CrudAction::Read, None);

        let (rows, has_more) = self
            .comments
            .list(prompt.id, include_hidden, after, i64::from(limit))
            .await?;

        let next_cursor = if has_more {
            rows.last()
                .map(|row| encode_cursor(row.comment.created_at, row.comment.id))
        } else {
            None
        };
        let items = rows
            .into_iter()
            .map(|row| CommentView::new(row.comment.into(), row.username))
            .collect();

        Ok(CommentPage { items, next_cursor })
    }

    // ===========================================
    // Reviews
    // ===========================================

    pub async fn write_review(
        &self,
        actor: &Actor,
        slug: &str,
        request: &WriteReviewRequest,
    ) -> ApiResult<ReviewOutcome> {
        let prompt = self.prompt(actor, slug).await?;
        let (review, rating) = self
            .reviews
            .upsert(actor.user_id, prompt.id, request.rating, request.comment.trim())
            .await?;
        Ok(ReviewOutcome {
            review: review.into(),
            rating,
        })
    }

    pub async fn list_reviews(
        &self,
        actor: &Actor,
        slug: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> ApiResult<Vec<Review>> {
        let prompt = self.prompt(actor, slug).await?;
        let request = PageRequest::new(page, per_page, self.max_page_size);
        Ok(self
            .reviews
            .list_for_prompt(prompt.id, request.limit(), request.offset())
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn saved(
        &self,
        actor: &Actor,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> ApiResult<Page<PromptSummary>> {
        let request = PageRequest::new(page, per_page, self.max_page_size);
        let (rows, total) = self
            .interactions
            .saved_prompts(actor.user_id, request)
            .await?;
        let items = rows
            .into_iter()
            .map(|e| PromptSummary::from(Prompt::from(e)))
            .collect();
        Ok(Page::new(items, request, total))
    }
}

fn comment_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_COMMENT_LIMIT)
        .clamp(1, MAX_COMMENT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_limit_defaults_and_clamps() {
        assert_eq!(comment_limit(None), DEFAULT_COMMENT_LIMIT);
        assert_eq!(comment_limit(Some(0)), 1);
        assert_eq!(comment_limit(Some(500)), MAX_COMMENT_LIMIT);
        assert_eq!(comment_limit(Some(35)), 35);
    }
}

//! Comment repository. Threads are one level of `parent_id` links within a
//! prompt; deletion is logical.

use chrono::{DateTime, Utc};
use domain::models::engagement::CommentStatus;
use domain::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{CommentEntity, CommentStatusDb, CommentWithAuthorEntity};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const COMMENT_COLUMNS: &str =
    "id, prompt_id, user_id, parent_id, text, status, like_count, created_at, updated_at";

#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentEntity>, sqlx::Error> {
        sqlx::query_as::<_, CommentEntity>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Add a visible comment and bump the prompt's comment counter.
    ///
    /// A parent must exist on the same prompt and must not be deleted.
    pub async fn create(
        &self,
        prompt_id: Uuid,
        user_id: Uuid,
        text: &str,
        parent_id: Option<Uuid>,
    ) -> RepositoryResult<CommentEntity> {
        let timer = QueryTimer::new("create_comment");
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = parent_id {
            let parent_status = sqlx::query_scalar::<_, CommentStatusDb>(
                "SELECT status FROM comments WHERE id = $1 AND prompt_id = $2 FOR SHARE",
            )
            .bind(parent_id)
            .bind(prompt_id)
            .fetch_optional(&mut *tx)
            .await?;

            match parent_status {
                None => {
                    return Err(DomainError::InvalidParent(
                        "Parent comment does not belong to this prompt".to_string(),
                    )
                    .into())
                }
                Some(CommentStatusDb::Deleted) => {
                    return Err(DomainError::InvalidParent(
                        "Cannot reply to a deleted comment".to_string(),
                    )
                    .into())
                }
                Some(_) => {}
            }
        }

        let entity = sqlx::query_as::<_, CommentEntity>(&format!(
            r#"
            INSERT INTO comments (prompt_id, user_id, parent_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(prompt_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Comment"))?;

        sqlx::query("UPDATE prompts SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(prompt_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Change a comment's status, moving the prompt's visible-comment counter
    /// when the comment enters or leaves the visible state.
    pub async fn set_status(
        &self,
        id: Uuid,
        to: CommentStatus,
    ) -> RepositoryResult<CommentEntity> {
        let timer = QueryTimer::new("set_comment_status");
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, CommentEntity>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Comment"))?;

        let from: CommentStatus = current.status.into();
        if from == to {
            tx.commit().await?;
            return Ok(current);
        }

        let entity = sqlx::query_as::<_, CommentEntity>(&format!(
            r#"
            UPDATE comments SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(CommentStatusDb::from(to))
        .fetch_one(&mut *tx)
        .await?;

        let delta = from.counter_delta(to);
        if delta != 0 {
            sqlx::query(
                "UPDATE prompts SET comment_count = GREATEST(comment_count + $2, 0) WHERE id = $1",
            )
            .bind(current.prompt_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// One page of a prompt's comments in (created_at, id) order, strictly
    /// after `after`. Fetches `limit + 1` rows; the flag reports whether more remain.
    pub async fn list(
        &self,
        prompt_id: Uuid,
        include_hidden: bool,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<(Vec<CommentWithAuthorEntity>, bool), sqlx::Error> {
        let timer = QueryTimer::new("list_comments");
        let (after_at, after_id) = after.unzip();
        let mut rows = sqlx::query_as::<_, CommentWithAuthorEntity>(
            r#"
            SELECT c.id, c.prompt_id, c.user_id, c.parent_id, c.text, c.status, c.like_count,
                   c.created_at, c.updated_at, u.username
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.prompt_id = $1
              AND ($2 OR c.status <> 'hidden')
              AND ($3::TIMESTAMPTZ IS NULL OR (c.created_at, c.id) > ($3, $4))
            ORDER BY c.created_at, c.id
            LIMIT $5
            "#,
        )
        .bind(prompt_id)
        .bind(include_hidden)
        .bind(after_at)
        .bind(after_id)
        .bind(limit + 1)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let has_more = rows.len() as i64 > limit;
        rows.truncate(limit.max(0) as usize);
        Ok((rows, has_more))
    }
}

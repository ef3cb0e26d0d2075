//! Review repository. One review per user per prompt; its stars feed the
//! same rating aggregate as a plain rating.

use domain::models::engagement::RatingOutcome;
use sqlx::PgPool;
use uuid::Uuid;

use super::interaction::apply_rating_in;
use crate::entities::ReviewEntity;
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const REVIEW_COLUMNS: &str = "id, prompt_id, user_id, rating, comment, created_at, updated_at";

#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or replace the user's review and apply its rating.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        prompt_id: Uuid,
        rating: i16,
        comment: &str,
    ) -> RepositoryResult<(ReviewEntity, RatingOutcome)> {
        let timer = QueryTimer::new("upsert_review");
        let mut tx = self.pool.begin().await?;

        let outcome = apply_rating_in(&mut tx, user_id, prompt_id, rating).await?;

        let review = sqlx::query_as::<_, ReviewEntity>(&format!(
            r#"
            INSERT INTO reviews (prompt_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (prompt_id, user_id) DO UPDATE SET
                rating = EXCLUDED.rating,
                comment = EXCLUDED.comment,
                updated_at = NOW()
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(prompt_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Review"))?;

        tx.commit().await?;
        timer.record();
        Ok((review, outcome))
    }

    pub async fn list_for_prompt(
        &self,
        prompt_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReviewEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_reviews");
        let result = sqlx::query_as::<_, ReviewEntity>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM reviews
            WHERE prompt_id = $1
            ORDER BY updated_at DESC, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(prompt_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

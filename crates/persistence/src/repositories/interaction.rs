//! Per-user interaction repository: likes, saves, views and ratings.
//!
//! Every counter move on `prompts` happens in the same transaction as the
//! interaction change that caused it.

use domain::models::engagement::{RatingOutcome, ToggleOutcome, ViewOutcome};
use domain::services::{flag_delta, RatingAggregate, ToggleKind};
use shared::pagination::PageRequest;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{InteractionEntity, PromptEntity, PROMPT_COLUMNS};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const INTERACTION_COLUMNS: &str = "user_id, prompt_id, is_liked, is_saved, rating, view_count, last_viewed_at, liked_at, saved_at, rated_at";

/// Interaction flag column, its timestamp column and the prompt counter it drives.
fn toggle_columns(kind: ToggleKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        ToggleKind::Like => ("is_liked", "liked_at", "like_count"),
        ToggleKind::Save => ("is_saved", "saved_at", "save_count"),
    }
}

#[derive(Clone)]
pub struct InteractionRepository {
    pool: PgPool,
}

impl InteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        user_id: Uuid,
        prompt_id: Uuid,
    ) -> Result<Option<InteractionEntity>, sqlx::Error> {
        sqlx::query_as::<_, InteractionEntity>(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM user_prompt_interactions WHERE user_id = $1 AND prompt_id = $2"
        ))
        .bind(user_id)
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Set a like or save flag. The prompt counter moves by exactly one only
    /// when the stored flag actually changed.
    pub async fn set_flag(
        &self,
        user_id: Uuid,
        prompt_id: Uuid,
        kind: ToggleKind,
        value: bool,
    ) -> RepositoryResult<ToggleOutcome> {
        let timer = QueryTimer::new("set_interaction_flag");
        let (flag, at, counter) = toggle_columns(kind);
        let mut tx = self.pool.begin().await?;

        ensure_interaction_in(&mut tx, user_id, prompt_id).await?;

        let changed = sqlx::query_scalar::<_, bool>(&format!(
            r#"
            UPDATE user_prompt_interactions
            SET {flag} = $3, {at} = CASE WHEN $3 THEN NOW() ELSE NULL END
            WHERE user_id = $1 AND prompt_id = $2 AND {flag} IS DISTINCT FROM $3
            RETURNING {flag}
            "#
        ))
        .bind(user_id)
        .bind(prompt_id)
        .bind(value)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

        let count = if changed {
            sqlx::query_scalar::<_, i32>(&format!(
                "UPDATE prompts SET {counter} = GREATEST({counter} + $2, 0) WHERE id = $1 RETURNING {counter}"
            ))
            .bind(prompt_id)
            .bind(flag_delta(Some(!value), value))
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar::<_, i32>(&format!("SELECT {counter} FROM prompts WHERE id = $1"))
                .bind(prompt_id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        timer.record();

        tracing::debug!(
            user_id = %user_id,
            prompt_id = %prompt_id,
            kind = kind.as_str(),
            value,
            changed,
            "Interaction flag set"
        );

        Ok(ToggleOutcome {
            changed,
            value,
            count,
        })
    }

    /// Count one view. Known users also get their per-user view counter bumped.
    pub async fn record_view(
        &self,
        prompt_id: Uuid,
        user_id: Option<Uuid>,
    ) -> RepositoryResult<ViewOutcome> {
        let timer = QueryTimer::new("record_prompt_view");
        let mut tx = self.pool.begin().await?;

        let view_count = sqlx::query_scalar::<_, i64>(
            "UPDATE prompts SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(prompt_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Prompt"))?;

        let user_view_count = match user_id {
            Some(user_id) => Some(
                sqlx::query_scalar::<_, i32>(
                    r#"
                    INSERT INTO user_prompt_interactions (user_id, prompt_id, view_count, last_viewed_at)
                    VALUES ($1, $2, 1, NOW())
                    ON CONFLICT (user_id, prompt_id) DO UPDATE SET
                        view_count = user_prompt_interactions.view_count + 1,
                        last_viewed_at = NOW()
                    RETURNING view_count
                    "#,
                )
                .bind(user_id)
                .bind(prompt_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| RepositoryError::from_write(e, "Interaction"))?,
            ),
            None => None,
        };

        tx.commit().await?;
        timer.record();

        Ok(ViewOutcome {
            view_count,
            user_view_count,
        })
    }

    pub async fn rate(
        &self,
        user_id: Uuid,
        prompt_id: Uuid,
        stars: i16,
    ) -> RepositoryResult<RatingOutcome> {
        let timer = QueryTimer::new("rate_prompt");
        let mut tx = self.pool.begin().await?;
        let outcome = apply_rating_in(&mut tx, user_id, prompt_id, stars).await?;
        tx.commit().await?;
        timer.record();
        Ok(outcome)
    }

    /// Prompts the user has saved, most recently saved first.
    pub async fn saved_prompts(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<PromptEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_saved_prompts");
        let items = sqlx::query_as::<_, PromptEntity>(&format!(
            r#"
            SELECT {PROMPT_COLUMNS}
            FROM user_prompt_interactions i
            JOIN prompts p ON p.id = i.prompt_id
            WHERE i.user_id = $1 AND i.is_saved AND p.is_active
            ORDER BY i.saved_at DESC NULLS LAST, p.id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_prompt_interactions i
            JOIN prompts p ON p.id = i.prompt_id
            WHERE i.user_id = $1 AND i.is_saved AND p.is_active
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        timer.record();
        Ok((items, total))
    }
}

async fn ensure_interaction_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    prompt_id: Uuid,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_prompt_interactions (user_id, prompt_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, prompt_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(prompt_id)
    .execute(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "Interaction"))?;
    Ok(())
}

/// Record a user's stars and update the prompt aggregate and any review the
/// user wrote. Locks the prompt row, then the interaction row, so concurrent
/// raters serialize per prompt.
pub(crate) async fn apply_rating_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    prompt_id: Uuid,
    stars: i16,
) -> RepositoryResult<RatingOutcome> {
    let (sum, count) = sqlx::query_as::<_, (i64, i32)>(
        "SELECT rating_sum, rating_count FROM prompts WHERE id = $1 FOR UPDATE",
    )
    .bind(prompt_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::not_found("Prompt"))?;

    ensure_interaction_in(conn, user_id, prompt_id).await?;

    let previous = sqlx::query_scalar::<_, Option<i16>>(
        "SELECT rating FROM user_prompt_interactions WHERE user_id = $1 AND prompt_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(prompt_id)
    .fetch_one(&mut *conn)
    .await?;

    let aggregate = RatingAggregate::new(sum, count).apply(previous, stars)?;

    sqlx::query(
        r#"
        UPDATE user_prompt_interactions SET rating = $3, rated_at = NOW()
        WHERE user_id = $1 AND prompt_id = $2
        "#,
    )
    .bind(user_id)
    .bind(prompt_id)
    .bind(stars)
    .execute(&mut *conn)
    .await?;

    // A review carries the same stars as its author's rating
    sqlx::query(
        "UPDATE reviews SET rating = $3, updated_at = NOW() WHERE user_id = $1 AND prompt_id = $2 AND rating <> $3",
    )
    .bind(user_id)
    .bind(prompt_id)
    .bind(stars)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE prompts SET rating_sum = $2, rating_count = $3, average_rating = $4 WHERE id = $1",
    )
    .bind(prompt_id)
    .bind(aggregate.sum)
    .bind(aggregate.count)
    .bind(aggregate.average())
    .execute(&mut *conn)
    .await?;

    Ok(RatingOutcome {
        previous,
        stars,
        rating_count: aggregate.count,
        average_rating: aggregate.average(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_columns() {
        assert_eq!(
            toggle_columns(ToggleKind::Like),
            ("is_liked", "liked_at", "like_count")
        );
        assert_eq!(toggle_columns(ToggleKind::Save).2, "save_count");
    }
}

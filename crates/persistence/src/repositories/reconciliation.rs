//! Recount denormalized counters from their source rows.
//!
//! View and share counters have no source rows and are left alone.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::metrics::QueryTimer;

const RECONCILE_BATCH: i64 = 500;

/// Rows corrected by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub prompts_fixed: u64,
    pub tags_fixed: u64,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.prompts_fixed == 0 && self.tags_fixed == 0
    }
}

#[derive(Clone)]
pub struct ReconciliationRepository {
    pool: PgPool,
}

impl ReconciliationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recompute like, save, comment and rating aggregates per prompt and
    /// usage counts per tag. Only rows whose stored values drifted are written.
    ///
    /// Rows are locked in id-ordered batches before they are recounted. The
    /// recount is a later statement, so under READ COMMITTED it sees every
    /// writer that committed while the lock was pending, and writers still in
    /// flight apply their delta on top of the corrected value.
    pub async fn reconcile(&self) -> Result<ReconcileReport, sqlx::Error> {
        let timer = QueryTimer::new("reconcile_counters");
        let mut report = ReconcileReport::default();

        let mut after = Uuid::nil();
        loop {
            let mut tx = self.pool.begin().await?;
            let ids = lock_batch(&mut tx, "prompts", after).await?;
            let Some(last) = ids.last().copied() else {
                break;
            };
            report.prompts_fixed += recount_prompts(&mut tx, &ids).await?;
            tx.commit().await?;
            if ids.len() < RECONCILE_BATCH as usize {
                break;
            }
            after = last;
        }

        let mut after = Uuid::nil();
        loop {
            let mut tx = self.pool.begin().await?;
            let ids = lock_batch(&mut tx, "tags", after).await?;
            let Some(last) = ids.last().copied() else {
                break;
            };
            report.tags_fixed += recount_tags(&mut tx, &ids).await?;
            tx.commit().await?;
            if ids.len() < RECONCILE_BATCH as usize {
                break;
            }
            after = last;
        }

        timer.record();

        if !report.is_clean() {
            tracing::warn!(
                prompts_fixed = report.prompts_fixed,
                tags_fixed = report.tags_fixed,
                "Counter drift corrected"
            );
        }
        Ok(report)
    }
}

/// Locks the next batch of rows of `table` with ids above `after`.
async fn lock_batch(
    conn: &mut PgConnection,
    table: &'static str,
    after: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(&format!(
        "SELECT id FROM {table} WHERE id > $1 ORDER BY id LIMIT $2 FOR UPDATE"
    ))
    .bind(after)
    .bind(RECONCILE_BATCH)
    .fetch_all(conn)
    .await
}

async fn recount_prompts(conn: &mut PgConnection, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        WITH agg AS (
            SELECT p.id,
                   COALESCE(i.likes, 0)::INT AS likes,
                   COALESCE(i.saves, 0)::INT AS saves,
                   COALESCE(i.rating_sum, 0)::BIGINT AS rating_sum,
                   COALESCE(i.rating_count, 0)::INT AS rating_count,
                   COALESCE(c.visible, 0)::INT AS comments
            FROM prompts p
            LEFT JOIN (
                SELECT prompt_id,
                       COUNT(*) FILTER (WHERE is_liked) AS likes,
                       COUNT(*) FILTER (WHERE is_saved) AS saves,
                       SUM(rating) AS rating_sum,
                       COUNT(rating) AS rating_count
                FROM user_prompt_interactions
                WHERE prompt_id = ANY($1)
                GROUP BY prompt_id
            ) i ON i.prompt_id = p.id
            LEFT JOIN (
                SELECT prompt_id, COUNT(*) AS visible
                FROM comments
                WHERE status = 'visible' AND prompt_id = ANY($1)
                GROUP BY prompt_id
            ) c ON c.prompt_id = p.id
            WHERE p.id = ANY($1)
        )
        UPDATE prompts p SET
            like_count = agg.likes,
            save_count = agg.saves,
            comment_count = agg.comments,
            rating_sum = agg.rating_sum,
            rating_count = agg.rating_count,
            average_rating = CASE WHEN agg.rating_count > 0
                THEN agg.rating_sum::DOUBLE PRECISION / agg.rating_count
                ELSE 0 END
        FROM agg
        WHERE agg.id = p.id
          AND (p.like_count, p.save_count, p.comment_count, p.rating_sum, p.rating_count)
              IS DISTINCT FROM
              (agg.likes, agg.saves, agg.comments, agg.rating_sum, agg.rating_count)
        "#,
    )
    .bind(ids)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

async fn recount_tags(conn: &mut PgConnection, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        WITH usage AS (
            SELECT t.id, COUNT(pt.tag_id)::INT AS used
            FROM tags t
            LEFT JOIN prompt_tags pt ON pt.tag_id = t.id
            WHERE t.id = ANY($1)
            GROUP BY t.id
        )
        UPDATE tags t SET usage_count = usage.used
        FROM usage
        WHERE usage.id = t.id AND t.usage_count <> usage.used
        "#,
    )
    .bind(ids)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

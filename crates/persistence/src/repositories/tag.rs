//! Tag repository, including the usage-counted prompt links.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::TagEntity;
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const TAG_COLUMNS: &str = "id, name, slug, usage_count, is_active, created_at";

#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List active tags, most used first, optionally filtered by name.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
    ) -> Result<Vec<TagEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_tags");
        let result = sqlx::query_as::<_, TagEntity>(&format!(
            r#"
            SELECT {TAG_COLUMNS} FROM tags
            WHERE is_active
              AND ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY usage_count DESC, name
            LIMIT $2
            "#
        ))
        .bind(search)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<TagEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_tag_by_slug");
        let result = sqlx::query_as::<_, TagEntity>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create(&self, name: &str, slug: &str) -> RepositoryResult<TagEntity> {
        let timer = QueryTimer::new("create_tag");
        let result = sqlx::query_as::<_, TagEntity>(&format!(
            "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING {TAG_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Tag"))
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await
    }
}

pub(crate) async fn tag_id_in(conn: &mut PgConnection, slug: &str) -> RepositoryResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found(format!("Tag {slug}")))
}

/// Inserts the link and bumps `usage_count` only when a row was created.
pub(crate) async fn attach_in(
    conn: &mut PgConnection,
    prompt_id: Uuid,
    tag_id: Uuid,
) -> RepositoryResult<i32> {
    let bumped = sqlx::query_scalar::<_, i32>(
        r#"
        WITH ins AS (
            INSERT INTO prompt_tags (prompt_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING tag_id
        )
        UPDATE tags SET usage_count = usage_count + 1
        WHERE id IN (SELECT tag_id FROM ins)
        RETURNING usage_count
        "#,
    )
    .bind(prompt_id)
    .bind(tag_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "Prompt tag"))?;

    match bumped {
        Some(count) => Ok(count),
        None => current_usage(conn, tag_id).await,
    }
}

/// Deletes the link and decrements `usage_count`, floored at zero, only when
/// a row was removed.
pub(crate) async fn detach_in(
    conn: &mut PgConnection,
    prompt_id: Uuid,
    tag_id: Uuid,
) -> RepositoryResult<i32> {
    let dropped = sqlx::query_scalar::<_, i32>(
        r#"
        WITH del AS (
            DELETE FROM prompt_tags
            WHERE prompt_id = $1 AND tag_id = $2
            RETURNING tag_id
        )
        UPDATE tags SET usage_count = GREATEST(usage_count - 1, 0)
        WHERE id IN (SELECT tag_id FROM del)
        RETURNING usage_count
        "#,
    )
    .bind(prompt_id)
    .bind(tag_id)
    .fetch_optional(&mut *conn)
    .await?;

    match dropped {
        Some(count) => Ok(count),
        None => current_usage(conn, tag_id).await,
    }
}

async fn current_usage(conn: &mut PgConnection, tag_id: Uuid) -> RepositoryResult<i32> {
    Ok(
        sqlx::query_scalar::<_, i32>("SELECT usage_count FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_one(conn)
            .await?,
    )
}

//! Prompt repository: catalog records, content and taxonomy links.

use chrono::{DateTime, Utc};
use domain::models::prompt::{
    AttachAiModelRequest, CreatePromptRequest, ListPromptsQuery, PromptContentInput,
    PromptSort, PromptStatus, UpdatePromptRequest,
};
use domain::DomainError;
use shared::pagination::PageRequest;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::category::category_id_in;
use super::tag::{attach_in, detach_in, tag_id_in};
use crate::entities::{
    PromptCategoryLinkEntity, PromptContentEntity, PromptEntity, PromptModelLinkEntity,
    PromptStatusDb, TagEntity, PROMPT_COLUMNS,
};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const CONTENT_COLUMNS: &str = "prompt_id, prompt_text, prompt_text_en, usage_guide, example_input, example_output, tips, variables, updated_at";

/// Shared filter for listing and counting. Parameters $1..$8.
const LIST_FILTER: &str = r#"
    WHERE p.is_active
      AND (NOT $1 OR p.status = 'published')
      AND ($2::prompt_status IS NULL OR p.status = $2)
      AND ($3::TEXT IS NULL OR EXISTS (
            SELECT 1 FROM prompt_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.prompt_id = p.id AND c.code = $3))
      AND ($4::TEXT IS NULL OR EXISTS (
            SELECT 1 FROM prompt_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.prompt_id = p.id AND t.slug = $4))
      AND ($5::TEXT IS NULL
            OR p.title ILIKE $5 ESCAPE '\'
            OR p.short_description ILIKE $5 ESCAPE '\'
            OR EXISTS (
                SELECT 1 FROM prompt_tags pt
                JOIN tags t ON t.id = pt.tag_id
                WHERE pt.prompt_id = p.id AND t.name ILIKE $5 ESCAPE '\'))
      AND ($6::BOOLEAN IS NULL OR p.is_featured = $6)
      AND ($7::BOOLEAN IS NULL OR p.is_premium = $7)
      AND ($8::UUID IS NULL OR p.created_by = $8)
"#;

fn order_clause(sort: PromptSort) -> &'static str {
    match sort {
        PromptSort::Newest => "COALESCE(p.published_at, p.created_at) DESC, p.id DESC",
        PromptSort::Popular => "p.like_count DESC, p.view_count DESC, p.id DESC",
        PromptSort::Rating => "p.average_rating DESC, p.rating_count DESC, p.id DESC",
        PromptSort::Views => "p.view_count DESC, p.id DESC",
        PromptSort::Title => "p.title ASC, p.id ASC",
    }
}

/// Wraps user text in `%...%` with LIKE metacharacters escaped.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Resolved fields for a new prompt.
#[derive(Debug, Clone)]
pub struct NewPrompt<'a> {
    pub request: &'a CreatePromptRequest,
    pub slug: &'a str,
    pub ticket_cost: i32,
    pub created_by: Uuid,
}

#[derive(Clone)]
pub struct PromptRepository {
    pool: PgPool,
}

impl PromptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List prompts matching the query. Returns the page and the total count.
    pub async fn list(
        &self,
        query: &ListPromptsQuery,
        published_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<PromptEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_prompts");
        let search = query.search_text().map(like_pattern);
        let status = query.status.map(PromptStatusDb::from);

        let items = sqlx::query_as::<_, PromptEntity>(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts p {LIST_FILTER} ORDER BY {} LIMIT $9 OFFSET $10",
            order_clause(query.sort)
        ))
        .bind(published_only)
        .bind(status)
        .bind(query.category.as_deref())
        .bind(query.tag.as_deref())
        .bind(search.as_deref())
        .bind(query.featured)
        .bind(query.premium)
        .bind(query.created_by)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM prompts p {LIST_FILTER}"
        ))
        .bind(published_only)
        .bind(status)
        .bind(query.category.as_deref())
        .bind(query.tag.as_deref())
        .bind(search.as_deref())
        .bind(query.featured)
        .bind(query.premium)
        .bind(query.created_by)
        .fetch_one(&self.pool)
        .await?;

        timer.record();
        Ok((items, total))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<PromptEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_prompt_by_slug");
        let result = sqlx::query_as::<_, PromptEntity>(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PromptEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_prompt_by_id");
        let result = sqlx::query_as::<_, PromptEntity>(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Create a draft prompt with its content and taxonomy links.
    ///
    /// The first category code becomes the primary category.
    pub async fn create(&self, new: NewPrompt<'_>) -> RepositoryResult<PromptEntity> {
        let timer = QueryTimer::new("create_prompt");
        let request = new.request;
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, PromptEntity>(&format!(
            r#"
            INSERT INTO prompts AS p (
                title, slug, short_description, author_id, source_id, level_id, thumbnail_url,
                is_premium, ticket_cost, price_cents, original_price_cents, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {PROMPT_COLUMNS}
            "#
        ))
        .bind(&request.title)
        .bind(new.slug)
        .bind(request.short_description.as_deref())
        .bind(request.author_id)
        .bind(request.source_id)
        .bind(request.level_id)
        .bind(request.thumbnail_url.as_deref())
        .bind(request.is_premium)
        .bind(new.ticket_cost)
        .bind(request.price_cents)
        .bind(request.original_price_cents)
        .bind(new.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Prompt"))?;

        upsert_content_in(&mut tx, entity.id, &request.content).await?;

        for (index, code) in request.category_codes.iter().enumerate() {
            let category_id = category_id_in(&mut tx, code).await?;
            link_category_in(&mut tx, entity.id, category_id, index == 0).await?;
        }

        for slug in &request.tag_slugs {
            let tag_id = tag_id_in(&mut tx, slug).await?;
            attach_in(&mut tx, entity.id, tag_id).await?;
        }

        let entity = if request.category_codes.is_empty() {
            entity
        } else {
            sync_primary_category_in(&mut tx, entity.id).await?
        };

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Apply a partial update; content, when present, replaces the stored content.
    pub async fn update(
        &self,
        id: Uuid,
        updated_by: Uuid,
        request: &UpdatePromptRequest,
    ) -> RepositoryResult<PromptEntity> {
        let timer = QueryTimer::new("update_prompt");
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, PromptEntity>(&format!(
            r#"
            UPDATE prompts AS p SET
                title = COALESCE($2, title),
                short_description = COALESCE($3, short_description),
                author_id = COALESCE($4, author_id),
                source_id = COALESCE($5, source_id),
                level_id = COALESCE($6, level_id),
                thumbnail_url = COALESCE($7, thumbnail_url),
                is_premium = COALESCE($8, is_premium),
                ticket_cost = COALESCE($9, ticket_cost),
                price_cents = COALESCE($10, price_cents),
                original_price_cents = COALESCE($11, original_price_cents),
                is_featured = COALESCE($12, is_featured),
                is_verified = COALESCE($13, is_verified),
                updated_by = $14,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROMPT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title.as_deref())
        .bind(request.short_description.as_deref())
        .bind(request.author_id)
        .bind(request.source_id)
        .bind(request.level_id)
        .bind(request.thumbnail_url.as_deref())
        .bind(request.is_premium)
        .bind(request.ticket_cost)
        .bind(request.price_cents)
        .bind(request.original_price_cents)
        .bind(request.is_featured)
        .bind(request.is_verified)
        .bind(updated_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Prompt"))?
        .ok_or_else(|| RepositoryError::not_found("Prompt"))?;

        if let Some(content) = &request.content {
            upsert_content_in(&mut tx, id, content).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Move a prompt from `from` to `to`. The update only applies while the
    /// stored status still equals `from`; otherwise the caller lost a race.
    pub async fn transition_status(
        &self,
        id: Uuid,
        from: PromptStatus,
        to: PromptStatus,
        published_at: Option<DateTime<Utc>>,
        updated_by: Uuid,
    ) -> RepositoryResult<PromptEntity> {
        let timer = QueryTimer::new("transition_prompt_status");
        let result = sqlx::query_as::<_, PromptEntity>(&format!(
            r#"
            UPDATE prompts AS p SET
                status = $3,
                published_at = $4,
                updated_by = $5,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {PROMPT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(PromptStatusDb::from(from))
        .bind(PromptStatusDb::from(to))
        .bind(published_at)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.ok_or_else(|| {
            tracing::warn!(prompt_id = %id, from = %from, to = %to, "Status changed concurrently");
            DomainError::Conflict("Prompt status changed, please retry".to_string()).into()
        })
    }

    /// Delete a prompt. Refused while purchases reference it. Tag usage counts
    /// are decremented in the same transaction; content and links cascade.
    pub async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let timer = QueryTimer::new("delete_prompt");
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM prompts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Prompt"))?;

        let purchased: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM purchases WHERE prompt_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if purchased {
            return Err(DomainError::ReferentialIntegrity(
                "Prompt has purchases and cannot be deleted".to_string(),
            )
            .into());
        }

        sqlx::query(
            r#"
            UPDATE tags SET usage_count = GREATEST(usage_count - 1, 0)
            WHERE id IN (SELECT tag_id FROM prompt_tags WHERE prompt_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM prompts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_delete(e, "Prompt"))?;

        tx.commit().await?;
        timer.record();
        Ok(())
    }

    pub async fn content(&self, id: Uuid) -> Result<Option<PromptContentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_prompt_content");
        let result = sqlx::query_as::<_, PromptContentEntity>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM prompt_contents WHERE prompt_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn categories(&self, id: Uuid) -> Result<Vec<PromptCategoryLinkEntity>, sqlx::Error> {
        sqlx::query_as::<_, PromptCategoryLinkEntity>(
            r#"
            SELECT c.id, c.parent_id, c.name, c.code, c.description, c.icon_url, c.color_hex,
                   c.sort_order, c.is_active, c.created_at, pc.is_primary
            FROM prompt_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.prompt_id = $1
            ORDER BY pc.is_primary DESC, c.sort_order, c.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn tags(&self, id: Uuid) -> Result<Vec<TagEntity>, sqlx::Error> {
        sqlx::query_as::<_, TagEntity>(
            r#"
            SELECT t.id, t.name, t.slug, t.usage_count, t.is_active, t.created_at
            FROM prompt_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.prompt_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn models(&self, id: Uuid) -> Result<Vec<PromptModelLinkEntity>, sqlx::Error> {
        sqlx::query_as::<_, PromptModelLinkEntity>(
            r#"
            SELECT m.id, m.platform_id, m.name, m.code, m.version, m.description, m.capabilities,
                   m.release_date, m.is_latest, m.is_active,
                   pm.is_recommended, pm.compatibility_score, pm.notes
            FROM prompt_ai_models pm
            JOIN ai_models m ON m.id = pm.model_id
            WHERE pm.prompt_id = $1
            ORDER BY pm.is_recommended DESC, pm.compatibility_score DESC NULLS LAST, m.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    /// Link a category. Marking it primary clears the flag on the prompt's
    /// other links and updates `primary_category_id` in the same transaction.
    pub async fn attach_category(
        &self,
        prompt_id: Uuid,
        category_code: &str,
        is_primary: bool,
    ) -> RepositoryResult<PromptEntity> {
        let timer = QueryTimer::new("attach_prompt_category");
        let mut tx = self.pool.begin().await?;

        lock_prompt_in(&mut tx, prompt_id).await?;
        let category_id = category_id_in(&mut tx, category_code).await?;
        link_category_in(&mut tx, prompt_id, category_id, is_primary).await?;
        let entity = sync_primary_category_in(&mut tx, prompt_id).await?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    pub async fn detach_category(
        &self,
        prompt_id: Uuid,
        category_code: &str,
    ) -> RepositoryResult<PromptEntity> {
        let timer = QueryTimer::new("detach_prompt_category");
        let mut tx = self.pool.begin().await?;

        lock_prompt_in(&mut tx, prompt_id).await?;
        let category_id = category_id_in(&mut tx, category_code).await?;
        sqlx::query("DELETE FROM prompt_categories WHERE prompt_id = $1 AND category_id = $2")
            .bind(prompt_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        let entity = sync_primary_category_in(&mut tx, prompt_id).await?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    pub async fn attach_model(
        &self,
        prompt_id: Uuid,
        model_id: Uuid,
        request: &AttachAiModelRequest,
    ) -> RepositoryResult<()> {
        let timer = QueryTimer::new("attach_prompt_model");
        let result = sqlx::query(
            r#"
            INSERT INTO prompt_ai_models (prompt_id, model_id, is_recommended, compatibility_score, notes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (prompt_id, model_id) DO UPDATE SET
                is_recommended = EXCLUDED.is_recommended,
                compatibility_score = EXCLUDED.compatibility_score,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(prompt_id)
        .bind(model_id)
        .bind(request.is_recommended)
        .bind(request.compatibility_score)
        .bind(request.notes.as_deref())
        .execute(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Prompt model link"))?;
        Ok(())
    }

    pub async fn detach_model(&self, prompt_id: Uuid, model_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("detach_prompt_model");
        let result =
            sqlx::query("DELETE FROM prompt_ai_models WHERE prompt_id = $1 AND model_id = $2")
                .bind(prompt_id)
                .bind(model_id)
                .execute(&self.pool)
                .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Attach or detach a tag on behalf of the catalog service.
    pub async fn set_tag(&self, prompt_id: Uuid, tag_slug: &str, linked: bool) -> RepositoryResult<i32> {
        let timer = QueryTimer::new("set_prompt_tag");
        let mut tx = self.pool.begin().await?;
        let tag_id = tag_id_in(&mut tx, tag_slug).await?;
        let count = if linked {
            attach_in(&mut tx, prompt_id, tag_id).await?
        } else {
            detach_in(&mut tx, prompt_id, tag_id).await?
        };
        tx.commit().await?;
        timer.record();
        Ok(count)
    }

    pub async fn increment_share(&self, id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        let timer = QueryTimer::new("increment_prompt_share");
        let result = sqlx::query_scalar::<_, i32>(
            "UPDATE prompts SET share_count = share_count + 1 WHERE id = $1 RETURNING share_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

async fn lock_prompt_in(conn: &mut PgConnection, prompt_id: Uuid) -> RepositoryResult<()> {
    sqlx::query("SELECT id FROM prompts WHERE id = $1 FOR UPDATE")
        .bind(prompt_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Prompt"))?;
    Ok(())
}

async fn upsert_content_in(
    conn: &mut PgConnection,
    prompt_id: Uuid,
    content: &PromptContentInput,
) -> RepositoryResult<()> {
    content.check_variables()?;
    sqlx::query(
        r#"
        INSERT INTO prompt_contents (
            prompt_id, prompt_text, prompt_text_en, usage_guide, example_input,
            example_output, tips, variables
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (prompt_id) DO UPDATE SET
            prompt_text = EXCLUDED.prompt_text,
            prompt_text_en = EXCLUDED.prompt_text_en,
            usage_guide = EXCLUDED.usage_guide,
            example_input = EXCLUDED.example_input,
            example_output = EXCLUDED.example_output,
            tips = EXCLUDED.tips,
            variables = EXCLUDED.variables,
            updated_at = NOW()
        "#,
    )
    .bind(prompt_id)
    .bind(&content.prompt_text)
    .bind(content.prompt_text_en.as_deref())
    .bind(content.usage_guide.as_deref())
    .bind(content.example_input.as_deref())
    .bind(content.example_output.as_deref())
    .bind(content.tips.as_deref())
    .bind(Json(&content.variables))
    .execute(conn)
    .await?;
    Ok(())
}

async fn link_category_in(
    conn: &mut PgConnection,
    prompt_id: Uuid,
    category_id: Uuid,
    is_primary: bool,
) -> RepositoryResult<()> {
    if is_primary {
        sqlx::query(
            "UPDATE prompt_categories SET is_primary = FALSE WHERE prompt_id = $1 AND category_id <> $2 AND is_primary",
        )
        .bind(prompt_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO prompt_categories (prompt_id, category_id, is_primary)
        VALUES ($1, $2, $3)
        ON CONFLICT (prompt_id, category_id) DO UPDATE SET is_primary = EXCLUDED.is_primary
        "#,
    )
    .bind(prompt_id)
    .bind(category_id)
    .bind(is_primary)
    .execute(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "Prompt category"))?;
    Ok(())
}

async fn sync_primary_category_in(
    conn: &mut PgConnection,
    prompt_id: Uuid,
) -> RepositoryResult<PromptEntity> {
    Ok(sqlx::query_as::<_, PromptEntity>(&format!(
        r#"
        UPDATE prompts AS p SET primary_category_id = (
            SELECT category_id FROM prompt_categories
            WHERE prompt_id = $1 AND is_primary
        )
        WHERE id = $1
        RETURNING {PROMPT_COLUMNS}
        "#
    ))
    .bind(prompt_id)
    .fetch_one(conn)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("email"), "%email%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_order_clause_is_deterministic() {
        for sort in [
            PromptSort::Newest,
            PromptSort::Popular,
            PromptSort::Rating,
            PromptSort::Views,
            PromptSort::Title,
        ] {
            assert!(order_clause(sort).contains("p.id"));
        }
        assert!(order_clause(PromptSort::Popular).starts_with("p.like_count DESC"));
    }
}

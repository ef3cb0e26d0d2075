//! Repository for prompt sources, difficulty levels and credited authors.

use domain::models::taxonomy::{
    CreatePromptAuthorRequest, CreatePromptLevelRequest, CreatePromptSourceRequest,
};
use sqlx::PgPool;

use crate::entities::{PromptAuthorEntity, PromptLevelEntity, PromptSourceEntity, SourceTypeDb};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const SOURCE_COLUMNS: &str = "id, name, url, source_type, description, is_verified, is_active";
const LEVEL_COLUMNS: &str =
    "id, name, code, description, requires_premium, ticket_cost, is_active";
const AUTHOR_COLUMNS: &str =
    "id, name, user_id, email, website, social_links, bio, is_verified, is_active";

#[derive(Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ===========================================
    // Sources
    // ===========================================

    pub async fn list_sources(&self) -> Result<Vec<PromptSourceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_prompt_sources");
        let result = sqlx::query_as::<_, PromptSourceEntity>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM prompt_sources WHERE is_active ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create_source(
        &self,
        request: &CreatePromptSourceRequest,
    ) -> RepositoryResult<PromptSourceEntity> {
        let timer = QueryTimer::new("create_prompt_source");
        let result = sqlx::query_as::<_, PromptSourceEntity>(&format!(
            r#"
            INSERT INTO prompt_sources (name, url, source_type, description, is_verified)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SOURCE_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(request.url.as_deref())
        .bind(SourceTypeDb::from(request.source_type))
        .bind(request.description.as_deref())
        .bind(request.is_verified)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Prompt source"))
    }

    // ===========================================
    // Levels
    // ===========================================

    pub async fn list_levels(&self) -> Result<Vec<PromptLevelEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_prompt_levels");
        let result = sqlx::query_as::<_, PromptLevelEntity>(&format!(
            "SELECT {LEVEL_COLUMNS} FROM prompt_levels WHERE is_active ORDER BY ticket_cost, code"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_level(
        &self,
        id: uuid::Uuid,
    ) -> Result<Option<PromptLevelEntity>, sqlx::Error> {
        sqlx::query_as::<_, PromptLevelEntity>(&format!(
            "SELECT {LEVEL_COLUMNS} FROM prompt_levels WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create_level(
        &self,
        request: &CreatePromptLevelRequest,
    ) -> RepositoryResult<PromptLevelEntity> {
        let timer = QueryTimer::new("create_prompt_level");
        let result = sqlx::query_as::<_, PromptLevelEntity>(&format!(
            r#"
            INSERT INTO prompt_levels (name, code, description, requires_premium, ticket_cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LEVEL_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(&request.code)
        .bind(request.description.as_deref())
        .bind(request.requires_premium)
        .bind(request.ticket_cost)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Prompt level"))
    }

    // ===========================================
    // Authors
    // ===========================================

    pub async fn list_authors(&self) -> Result<Vec<PromptAuthorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_prompt_authors");
        let result = sqlx::query_as::<_, PromptAuthorEntity>(&format!(
            "SELECT {AUTHOR_COLUMNS} FROM prompt_authors WHERE is_active ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create_author(
        &self,
        request: &CreatePromptAuthorRequest,
    ) -> RepositoryResult<PromptAuthorEntity> {
        let timer = QueryTimer::new("create_prompt_author");
        let result = sqlx::query_as::<_, PromptAuthorEntity>(&format!(
            r#"
            INSERT INTO prompt_authors (name, user_id, email, website, social_links, bio)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {AUTHOR_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(request.user_id)
        .bind(request.email.as_deref())
        .bind(request.website.as_deref())
        .bind(&request.social_links)
        .bind(request.bio.as_deref())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Prompt author"))
    }
}

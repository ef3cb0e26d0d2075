//! AI platform and model repository.

use domain::models::taxonomy::{CreateAiModelRequest, CreateAiPlatformRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AiModelEntity, AiPlatformEntity};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const PLATFORM_COLUMNS: &str = "id, name, code, company_name, website, logo_url, description, release_date, is_active, sort_order";
const MODEL_COLUMNS: &str = "id, platform_id, name, code, version, description, capabilities, release_date, is_latest, is_active";

#[derive(Clone)]
pub struct AiCatalogRepository {
    pool: PgPool,
}

impl AiCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_platforms(&self) -> Result<Vec<AiPlatformEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_ai_platforms");
        let result = sqlx::query_as::<_, AiPlatformEntity>(&format!(
            "SELECT {PLATFORM_COLUMNS} FROM ai_platforms WHERE is_active ORDER BY sort_order, name"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_platform(&self, code: &str) -> Result<Option<AiPlatformEntity>, sqlx::Error> {
        sqlx::query_as::<_, AiPlatformEntity>(&format!(
            "SELECT {PLATFORM_COLUMNS} FROM ai_platforms WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create_platform(
        &self,
        request: &CreateAiPlatformRequest,
    ) -> RepositoryResult<AiPlatformEntity> {
        let timer = QueryTimer::new("create_ai_platform");
        let result = sqlx::query_as::<_, AiPlatformEntity>(&format!(
            r#"
            INSERT INTO ai_platforms (name, code, company_name, website, logo_url, description, release_date, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PLATFORM_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(&request.code)
        .bind(request.company_name.as_deref())
        .bind(request.website.as_deref())
        .bind(request.logo_url.as_deref())
        .bind(request.description.as_deref())
        .bind(request.release_date)
        .bind(request.sort_order)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "AI platform"))
    }

    pub async fn list_models(&self, platform_code: &str) -> Result<Vec<AiModelEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_ai_models");
        let result = sqlx::query_as::<_, AiModelEntity>(
            r#"
            SELECT m.id, m.platform_id, m.name, m.code, m.version, m.description,
                   m.capabilities, m.release_date, m.is_latest, m.is_active
            FROM ai_models m
            JOIN ai_platforms p ON p.id = m.platform_id
            WHERE p.code = $1 AND m.is_active
            ORDER BY m.is_latest DESC, m.release_date DESC NULLS LAST, m.name
            "#,
        )
        .bind(platform_code)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_model(&self, id: Uuid) -> Result<Option<AiModelEntity>, sqlx::Error> {
        sqlx::query_as::<_, AiModelEntity>(&format!(
            "SELECT {MODEL_COLUMNS} FROM ai_models WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create a model under a platform. Marking it latest clears the flag on
    /// the platform's other models.
    pub async fn create_model(
        &self,
        platform_code: &str,
        request: &CreateAiModelRequest,
    ) -> RepositoryResult<AiModelEntity> {
        let timer = QueryTimer::new("create_ai_model");
        let mut tx = self.pool.begin().await?;

        let platform_id =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM ai_platforms WHERE code = $1")
                .bind(platform_code)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::not_found(format!("AI platform {platform_code}")))?;

        if request.is_latest {
            sqlx::query("UPDATE ai_models SET is_latest = FALSE WHERE platform_id = $1 AND is_latest")
                .bind(platform_id)
                .execute(&mut *tx)
                .await?;
        }

        let entity = sqlx::query_as::<_, AiModelEntity>(&format!(
            r#"
            INSERT INTO ai_models (platform_id, name, code, version, description, capabilities, release_date, is_latest)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MODEL_COLUMNS}
            "#
        ))
        .bind(platform_id)
        .bind(&request.name)
        .bind(&request.code)
        .bind(request.version.as_deref())
        .bind(request.description.as_deref())
        .bind(&request.capabilities)
        .bind(request.release_date)
        .bind(request.is_latest)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "AI model"))?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }
}

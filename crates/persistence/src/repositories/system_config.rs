//! System configuration repository: typed key-value rows.

use domain::models::system_config::ConfigType;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ConfigTypeDb, SystemConfigEntity};
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const CONFIG_COLUMNS: &str =
    "key, value, config_type, description, is_public, updated_by, updated_at";

/// Values written through [`SystemConfigRepository::upsert`].
#[derive(Debug, Clone)]
pub struct ConfigWrite<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub config_type: Option<ConfigType>,
    pub description: Option<&'a str>,
    pub is_public: Option<bool>,
    pub updated_by: Option<Uuid>,
}

#[derive(Clone)]
pub struct SystemConfigRepository {
    pool: PgPool,
}

impl SystemConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<SystemConfigEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_system_config");
        let result = sqlx::query_as::<_, SystemConfigEntity>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM system_config ORDER BY key"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn get(&self, key: &str) -> Result<Option<SystemConfigEntity>, sqlx::Error> {
        sqlx::query_as::<_, SystemConfigEntity>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM system_config WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert or update an entry. Absent type, description and visibility keep
    /// their stored values; new keys default to a private string.
    pub async fn upsert(&self, write: ConfigWrite<'_>) -> RepositoryResult<SystemConfigEntity> {
        let timer = QueryTimer::new("upsert_system_config");
        let result = sqlx::query_as::<_, SystemConfigEntity>(&format!(
            r#"
            INSERT INTO system_config AS sc (key, value, config_type, description, is_public, updated_by, updated_at)
            VALUES ($1, $2, COALESCE($3, 'string'::config_type), $4, COALESCE($5, FALSE), $6, NOW())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                config_type = COALESCE($3, sc.config_type),
                description = COALESCE($4, sc.description),
                is_public = COALESCE($5, sc.is_public),
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            RETURNING {CONFIG_COLUMNS}
            "#
        ))
        .bind(write.key)
        .bind(write.value)
        .bind(write.config_type.map(ConfigTypeDb::from))
        .bind(write.description)
        .bind(write.is_public)
        .bind(write.updated_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Config entry"))
    }
}

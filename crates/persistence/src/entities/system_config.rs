//! System configuration entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::system_config::{ConfigType, SystemConfigEntry};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for config_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "config_type", rename_all = "snake_case")]
pub enum ConfigTypeDb {
    String,
    Integer,
    Float,
    Boolean,
    Json,
}

impl From<ConfigTypeDb> for ConfigType {
    fn from(db: ConfigTypeDb) -> Self {
        match db {
            ConfigTypeDb::String => Self::String,
            ConfigTypeDb::Integer => Self::Integer,
            ConfigTypeDb::Float => Self::Float,
            ConfigTypeDb::Boolean => Self::Boolean,
            ConfigTypeDb::Json => Self::Json,
        }
    }
}

impl From<ConfigType> for ConfigTypeDb {
    fn from(domain: ConfigType) -> Self {
        match domain {
            ConfigType::String => Self::String,
            ConfigType::Integer => Self::Integer,
            ConfigType::Float => Self::Float,
            ConfigType::Boolean => Self::Boolean,
            ConfigType::Json => Self::Json,
        }
    }
}

/// Database row mapping for the system_config table.
#[derive(Debug, Clone, FromRow)]
pub struct SystemConfigEntity {
    pub key: String,
    pub value: String,
    pub config_type: ConfigTypeDb,
    pub description: Option<String>,
    pub is_public: bool,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl From<SystemConfigEntity> for SystemConfigEntry {
    fn from(entity: SystemConfigEntity) -> Self {
        Self {
            key: entity.key,
            value: entity.value,
            config_type: entity.config_type.into(),
            description: entity.description,
            is_public: entity.is_public,
            updated_by: entity.updated_by,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_entity_into_entry() {
        let entity = SystemConfigEntity {
            key: "commerce.one_purchase_per_prompt".into(),
            value: "true".into(),
            config_type: ConfigTypeDb::Boolean,
            description: None,
            is_public: false,
            updated_by: None,
            updated_at: Utc::now(),
        };
        let entry: SystemConfigEntry = entity.into();
        assert_eq!(entry.config_type, ConfigType::Boolean);
        assert!(entry.typed_value().is_ok());
    }
}

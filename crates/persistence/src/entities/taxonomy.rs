//! Taxonomy entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::taxonomy::{
    AiModel, AiPlatform, Category, PromptAuthor, PromptLevel, PromptSource, SourceType, Tag,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for source_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "source_type", rename_all = "snake_case")]
pub enum SourceTypeDb {
    Original,
    Community,
    Curated,
    Imported,
}

impl From<SourceTypeDb> for SourceType {
    fn from(db: SourceTypeDb) -> Self {
        match db {
            SourceTypeDb::Original => Self::Original,
            SourceTypeDb::Community => Self::Community,
            SourceTypeDb::Curated => Self::Curated,
            SourceTypeDb::Imported => Self::Imported,
        }
    }
}

impl From<SourceType> for SourceTypeDb {
    fn from(domain: SourceType) -> Self {
        match domain {
            SourceType::Original => Self::Original,
            SourceType::Community => Self::Community,
            SourceType::Curated => Self::Curated,
            SourceType::Imported => Self::Imported,
        }
    }
}

/// Database row mapping for the categories table.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryEntity {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub color_hex: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryEntity> for Category {
    fn from(entity: CategoryEntity) -> Self {
        Self {
            id: entity.id,
            parent_id: entity.parent_id,
            name: entity.name,
            code: entity.code,
            description: entity.description,
            icon_url: entity.icon_url,
            color_hex: entity.color_hex,
            sort_order: entity.sort_order,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the tags table.
#[derive(Debug, Clone, FromRow)]
pub struct TagEntity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TagEntity> for Tag {
    fn from(entity: TagEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            slug: entity.slug,
            usage_count: entity.usage_count,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the ai_platforms table.
#[derive(Debug, Clone, FromRow)]
pub struct AiPlatformEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl From<AiPlatformEntity> for AiPlatform {
    fn from(entity: AiPlatformEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            company_name: entity.company_name,
            website: entity.website,
            logo_url: entity.logo_url,
            description: entity.description,
            release_date: entity.release_date,
            is_active: entity.is_active,
            sort_order: entity.sort_order,
        }
    }
}

/// Database row mapping for the ai_models table.
#[derive(Debug, Clone, FromRow)]
pub struct AiModelEntity {
    pub id: Uuid,
    pub platform_id: Uuid,
    pub name: String,
    pub code: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub capabilities: Vec<String>,
    pub release_date: Option<NaiveDate>,
    pub is_latest: bool,
    pub is_active: bool,
}

impl From<AiModelEntity> for AiModel {
    fn from(entity: AiModelEntity) -> Self {
        Self {
            id: entity.id,
            platform_id: entity.platform_id,
            name: entity.name,
            code: entity.code,
            version: entity.version,
            description: entity.description,
            capabilities: entity.capabilities,
            release_date: entity.release_date,
            is_latest: entity.is_latest,
            is_active: entity.is_active,
        }
    }
}

/// Database row mapping for the prompt_sources table.
#[derive(Debug, Clone, FromRow)]
pub struct PromptSourceEntity {
    pub id: Uuid,
    pub name: String,
    pub url: Option<String>,
    pub source_type: SourceTypeDb,
    pub description: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
}

impl From<PromptSourceEntity> for PromptSource {
    fn from(entity: PromptSourceEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            url: entity.url,
            source_type: entity.source_type.into(),
            description: entity.description,
            is_verified: entity.is_verified,
            is_active: entity.is_active,
        }
    }
}

/// Database row mapping for the prompt_levels table.
#[derive(Debug, Clone, FromRow)]
pub struct PromptLevelEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub requires_premium: bool,
    pub ticket_cost: i32,
    pub is_active: bool,
}

impl From<PromptLevelEntity> for PromptLevel {
    fn from(entity: PromptLevelEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            description: entity.description,
            requires_premium: entity.requires_premium,
            ticket_cost: entity.ticket_cost,
            is_active: entity.is_active,
        }
    }
}

/// Database row mapping for the prompt_authors table.
#[derive(Debug, Clone, FromRow)]
pub struct PromptAuthorEntity {
    pub id: Uuid,
    pub name: String,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub social_links: serde_json::Value,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
}

impl From<PromptAuthorEntity> for PromptAuthor {
    fn from(entity: PromptAuthorEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            user_id: entity.user_id,
            email: entity.email,
            website: entity.website,
            social_links: entity.social_links,
            bio: entity.bio,
            is_verified: entity.is_verified,
            is_active: entity.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_round_trip() {
        for source in [
            SourceType::Original,
            SourceType::Community,
            SourceType::Curated,
            SourceType::Imported,
        ] {
            let db: SourceTypeDb = source.into();
            assert_eq!(SourceType::from(db), source);
        }
    }

    #[test]
    fn test_model_entity_keeps_capabilities() {
        let entity = AiModelEntity {
            id: Uuid::new_v4(),
            platform_id: Uuid::new_v4(),
            name: "GPT-4o".into(),
            code: "gpt-4o".into(),
            version: Some("2024-05".into()),
            description: None,
            capabilities: vec!["text".into(), "vision".into()],
            release_date: None,
            is_latest: true,
            is_active: true,
        };
        let model: AiModel = entity.into();
        assert_eq!(model.capabilities, vec!["text", "vision"]);
        assert!(model.is_latest);
    }
}

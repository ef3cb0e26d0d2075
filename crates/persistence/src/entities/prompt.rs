//! Prompt entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::prompt::{
    Prompt, PromptCategoryLink, PromptContent, PromptModelLink, PromptStatus, PromptVariable,
};
use domain::models::taxonomy::{AiModel, Category};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for prompt_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "prompt_status", rename_all = "snake_case")]
pub enum PromptStatusDb {
    Draft,
    Pending,
    Published,
    Archived,
}

impl From<PromptStatusDb> for PromptStatus {
    fn from(db: PromptStatusDb) -> Self {
        match db {
            PromptStatusDb::Draft => Self::Draft,
            PromptStatusDb::Pending => Self::Pending,
            PromptStatusDb::Published => Self::Published,
            PromptStatusDb::Archived => Self::Archived,
        }
    }
}

impl From<PromptStatus> for PromptStatusDb {
    fn from(domain: PromptStatus) -> Self {
        match domain {
            PromptStatus::Draft => Self::Draft,
            PromptStatus::Pending => Self::Pending,
            PromptStatus::Published => Self::Published,
            PromptStatus::Archived => Self::Archived,
        }
    }
}

/// Column list matching [`PromptEntity`], for reuse across queries.
pub const PROMPT_COLUMNS: &str = r#"
    p.id, p.title, p.slug, p.short_description, p.author_id, p.source_id, p.level_id,
    p.primary_category_id, p.thumbnail_url, p.status, p.is_premium, p.ticket_cost,
    p.price_cents, p.original_price_cents, p.is_featured, p.is_verified, p.view_count,
    p.like_count, p.save_count, p.share_count, p.comment_count, p.rating_sum, p.rating_count,
    p.average_rating, p.published_at, p.created_by, p.updated_by, p.is_active, p.created_at,
    p.updated_at
"#;

/// Database row mapping for the prompts table.
#[derive(Debug, Clone, FromRow)]
pub struct PromptEntity {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub author_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub level_id: Option<Uuid>,
    pub primary_category_id: Option<Uuid>,
    pub thumbnail_url: Option<String>,
    pub status: PromptStatusDb,
    pub is_premium: bool,
    pub ticket_cost: i32,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub is_featured: bool,
    pub is_verified: bool,
    pub view_count: i64,
    pub like_count: i32,
    pub save_count: i32,
    pub share_count: i32,
    pub comment_count: i32,
    pub rating_sum: i64,
    pub rating_count: i32,
    pub average_rating: f64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PromptEntity> for Prompt {
    fn from(entity: PromptEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            slug: entity.slug,
            short_description: entity.short_description,
            author_id: entity.author_id,
            source_id: entity.source_id,
            level_id: entity.level_id,
            primary_category_id: entity.primary_category_id,
            thumbnail_url: entity.thumbnail_url,
            status: entity.status.into(),
            is_premium: entity.is_premium,
            ticket_cost: entity.ticket_cost,
            price_cents: entity.price_cents,
            original_price_cents: entity.original_price_cents,
            is_featured: entity.is_featured,
            is_verified: entity.is_verified,
            view_count: entity.view_count,
            like_count: entity.like_count,
            save_count: entity.save_count,
            share_count: entity.share_count,
            comment_count: entity.comment_count,
            rating_sum: entity.rating_sum,
            rating_count: entity.rating_count,
            average_rating: entity.average_rating,
            published_at: entity.published_at,
            created_by: entity.created_by,
            updated_by: entity.updated_by,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the prompt_contents table.
#[derive(Debug, Clone, FromRow)]
pub struct PromptContentEntity {
    pub prompt_id: Uuid,
    pub prompt_text: String,
    pub prompt_text_en: Option<String>,
    pub usage_guide: Option<String>,
    pub example_input: Option<String>,
    pub example_output: Option<String>,
    pub tips: Option<String>,
    pub variables: Json<Vec<PromptVariable>>,
    pub updated_at: DateTime<Utc>,
}

impl From<PromptContentEntity> for PromptContent {
    fn from(entity: PromptContentEntity) -> Self {
        Self {
            prompt_id: entity.prompt_id,
            prompt_text: entity.prompt_text,
            prompt_text_en: entity.prompt_text_en,
            usage_guide: entity.usage_guide,
            example_input: entity.example_input,
            example_output: entity.example_output,
            tips: entity.tips,
            variables: entity.variables.0,
            updated_at: entity.updated_at,
        }
    }
}

/// A category joined through prompt_categories.
#[derive(Debug, Clone, FromRow)]
pub struct PromptCategoryLinkEntity {
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
    pub is_primary: bool,
}

impl From<PromptCategoryLinkEntity> for PromptCategoryLink {
    fn from(entity: PromptCategoryLinkEntity) -> Self {
        Self {
            category: Category {
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
            },
            is_primary: entity.is_primary,
        }
    }
}

/// An AI model joined through prompt_ai_models.
#[derive(Debug, Clone, FromRow)]
pub struct PromptModelLinkEntity {
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
    pub is_recommended: bool,
    pub compatibility_score: Option<i16>,
    pub notes: Option<String>,
}

impl From<PromptModelLinkEntity> for PromptModelLink {
    fn from(entity: PromptModelLinkEntity) -> Self {
        Self {
            model: AiModel {
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
            },
            is_recommended: entity.is_recommended,
            compatibility_score: entity.compatibility_score,
            notes: entity.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_entity() -> PromptEntity {
        PromptEntity {
            id: Uuid::new_v4(),
            title: "SEO Blog Writer".into(),
            slug: "seo-blog-writer".into(),
            short_description: None,
            author_id: None,
            source_id: None,
            level_id: None,
            primary_category_id: None,
            thumbnail_url: None,
            status: PromptStatusDb::Published,
            is_premium: true,
            ticket_cost: 2,
            price_cents: 7500,
            original_price_cents: Some(10000),
            is_featured: false,
            is_verified: false,
            view_count: 10,
            like_count: 3,
            save_count: 1,
            share_count: 0,
            comment_count: 2,
            rating_sum: 9,
            rating_count: 2,
            average_rating: 4.5,
            published_at: Some(Utc::now()),
            created_by: Uuid::new_v4(),
            updated_by: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in PromptStatus::all() {
            let db: PromptStatusDb = (*status).into();
            assert_eq!(PromptStatus::from(db), *status);
        }
    }

    #[test]
    fn test_prompt_entity_into_domain() {
        let prompt: Prompt = prompt_entity().into();
        assert_eq!(prompt.status, PromptStatus::Published);
        assert_eq!(prompt.discount_percentage(), 25);
        assert!((prompt.rating().average() - 4.5).abs() < f64::EPSILON);
        assert!(prompt.is_visible_to_public());
    }

    #[test]
    fn test_content_entity_unwraps_variables() {
        let entity = PromptContentEntity {
            prompt_id: Uuid::new_v4(),
            prompt_text: "Summarise {text}".into(),
            prompt_text_en: None,
            usage_guide: None,
            example_input: None,
            example_output: None,
            tips: None,
            variables: Json(vec![PromptVariable {
                name: "text".into(),
                description: None,
                example: None,
            }]),
            updated_at: Utc::now(),
        };
        let content: PromptContent = entity.into();
        assert_eq!(content.variables.len(), 1);
        assert_eq!(content.variables[0].name, "text");
    }
}

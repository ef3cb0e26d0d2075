//! Prompt catalog models: the prompt aggregate, its content blob and taxonomy links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::taxonomy::{AiModel, Category, Tag};
use crate::services::rating::RatingAggregate;

/// Publication status of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStatus {
    Draft,
    Pending,
    Published,
    Archived,
}

impl PromptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStatus::Draft => "draft",
            PromptStatus::Pending => "pending",
            PromptStatus::Published => "published",
            PromptStatus::Archived => "archived",
        }
    }

    pub fn all() -> &'static [PromptStatus] {
        &[
            PromptStatus::Draft,
            PromptStatus::Pending,
            PromptStatus::Published,
            PromptStatus::Archived,
        ]
    }
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(PromptStatus::Draft),
            "pending" => Ok(PromptStatus::Pending),
            "published" => Ok(PromptStatus::Published),
            "archived" => Ok(PromptStatus::Archived),
            _ => Err(format!("Invalid prompt status: {}", s)),
        }
    }
}

/// The catalog core record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub author_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub level_id: Option<Uuid>,
    pub primary_category_id: Option<Uuid>,
    pub thumbnail_url: Option<String>,
    pub status: PromptStatus,
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

impl Prompt {
    /// Whole-percent discount against the original price, 0 when not on sale.
    pub fn discount_percentage(&self) -> i32 {
        discount_percentage(self.price_cents, self.original_price_cents)
    }

    pub fn is_on_sale(&self) -> bool {
        self.discount_percentage() > 0
    }

    pub fn rating(&self) -> RatingAggregate {
        RatingAggregate::new(self.rating_sum, self.rating_count)
    }

    pub fn is_visible_to_public(&self) -> bool {
        self.is_active && self.status == PromptStatus::Published
    }
}

/// `(original - price) / original * 100`, truncated.
pub fn discount_percentage(price_cents: i64, original_price_cents: Option<i64>) -> i32 {
    match original_price_cents {
        Some(original) if original > price_cents && original > 0 => {
            ((original - price_cents) * 100 / original) as i32
        }
        _ => 0,
    }
}

/// A placeholder variable inside the prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PromptVariable {
    #[validate(length(min = 1, max = 50, message = "Variable name must be 1-50 characters"))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub example: Option<String>,
}

/// Full prompt body, owned 1-1 by a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContent {
    pub prompt_id: Uuid,
    pub prompt_text: String,
    pub prompt_text_en: Option<String>,
    pub usage_guide: Option<String>,
    pub example_input: Option<String>,
    pub example_output: Option<String>,
    pub tips: Option<String>,
    pub variables: Vec<PromptVariable>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PromptContentInput {
    #[validate(length(min = 1, max = 50000, message = "Prompt text is required"))]
    pub prompt_text: String,

    #[validate(length(max = 50000))]
    pub prompt_text_en: Option<String>,

    #[validate(length(max = 10000))]
    pub usage_guide: Option<String>,

    #[validate(length(max = 10000))]
    pub example_input: Option<String>,

    #[validate(length(max = 20000))]
    pub example_output: Option<String>,

    #[validate(length(max = 5000))]
    pub tips: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub variables: Vec<PromptVariable>,
}

impl PromptContentInput {
    /// Variable names must be unique within a prompt.
    pub fn check_variables(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for var in &self.variables {
            if !seen.insert(var.name.as_str()) {
                return Err(DomainError::validation(format!(
                    "Duplicate variable name: {}",
                    var.name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePromptRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    /// Derived from the title when absent.
    #[validate(custom(function = "shared::validation::validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(max = 500, message = "Short description must be at most 500 characters"))]
    pub short_description: Option<String>,

    pub author_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub level_id: Option<Uuid>,

    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail_url: Option<String>,

    #[serde(default)]
    pub is_premium: bool,

    /// Falls back to the level's ticket cost.
    #[validate(range(min = 0, max = 1000, message = "Ticket cost must be 0-1000"))]
    pub ticket_cost: Option<i32>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    #[serde(default)]
    pub price_cents: i64,

    #[validate(range(min = 0, message = "Original price cannot be negative"))]
    pub original_price_cents: Option<i64>,

    /// First code becomes the primary category.
    #[serde(default)]
    pub category_codes: Vec<String>,

    #[serde(default)]
    pub tag_slugs: Vec<String>,

    #[validate(nested)]
    pub content: PromptContentInput,
}

impl CreatePromptRequest {
    pub fn resolved_slug(&self) -> Result<String, DomainError> {
        let slug = match &self.slug {
            Some(s) => s.clone(),
            None => shared::validation::slugify(&self.title),
        };
        if slug.is_empty() {
            return Err(DomainError::validation(
                "Cannot derive a slug from the title; provide one explicitly",
            ));
        }
        Ok(slug)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePromptRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 500))]
    pub short_description: Option<String>,

    pub author_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub level_id: Option<Uuid>,

    #[validate(url)]
    pub thumbnail_url: Option<String>,

    pub is_premium: Option<bool>,

    #[validate(range(min = 0, max = 1000))]
    pub ticket_cost: Option<i32>,

    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,

    #[validate(range(min = 0))]
    pub original_price_cents: Option<i64>,

    /// Staff-only flags.
    pub is_featured: Option<bool>,
    pub is_verified: Option<bool>,

    #[validate(nested)]
    pub content: Option<PromptContentInput>,
}

impl UpdatePromptRequest {
    pub fn touches_staff_flags(&self) -> bool {
        self.is_featured.is_some() || self.is_verified.is_some()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TransitionStatusRequest {
    pub status: PromptStatus,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AttachCategoryRequest {
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AttachAiModelRequest {
    #[serde(default)]
    pub is_recommended: bool,

    #[validate(range(min = 1, max = 10, message = "Compatibility score must be 1-10"))]
    pub compatibility_score: Option<i16>,

    #[validate(length(max = 255))]
    pub notes: Option<String>,
}

/// Sort orders for catalog listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSort {
    #[default]
    Newest,
    Popular,
    Rating,
    Views,
    Title,
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPromptsQuery {
    pub status: Option<PromptStatus>,
    /// Category code.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    /// Free-text search over title, description and tag names.
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub premium: Option<bool>,
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub sort: PromptSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListPromptsQuery {
    /// Trimmed search text, `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Listing row.
#[derive(Debug, Clone, Serialize)]
pub struct PromptSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: PromptStatus,
    pub is_premium: bool,
    pub ticket_cost: i32,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub discount_percentage: i32,
    pub is_featured: bool,
    pub view_count: i64,
    pub like_count: i32,
    pub save_count: i32,
    pub comment_count: i32,
    pub average_rating: f64,
    pub rating_count: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Prompt> for PromptSummary {
    fn from(p: Prompt) -> Self {
        let discount_percentage = p.discount_percentage();
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            short_description: p.short_description,
            thumbnail_url: p.thumbnail_url,
            status: p.status,
            is_premium: p.is_premium,
            ticket_cost: p.ticket_cost,
            price_cents: p.price_cents,
            original_price_cents: p.original_price_cents,
            discount_percentage,
            is_featured: p.is_featured,
            view_count: p.view_count,
            like_count: p.like_count,
            save_count: p.save_count,
            comment_count: p.comment_count,
            average_rating: p.average_rating,
            rating_count: p.rating_count,
            published_at: p.published_at,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCategoryLink {
    #[serde(flatten)]
    pub category: Category,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptModelLink {
    #[serde(flatten)]
    pub model: AiModel,
    pub is_recommended: bool,
    pub compatibility_score: Option<i16>,
    pub notes: Option<String>,
}

/// A prompt with its content and every taxonomy link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDetail {
    pub prompt: Prompt,
    /// `None` when the reader may not see the body.
    pub content: Option<PromptContent>,
    pub locked: bool,
    pub categories: Vec<PromptCategoryLink>,
    pub tags: Vec<Tag>,
    pub models: Vec<PromptModelLink>,
}

impl PromptDetail {
    pub fn discount_percentage(&self) -> i32 {
        self.prompt.discount_percentage()
    }

    /// Hides the body, keeping the catalog metadata.
    pub fn redact_content(mut self) -> Self {
        self.content = None;
        self.locked = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> PromptContentInput {
        PromptContentInput {
            prompt_text: "Write a blog post about {topic}".into(),
            prompt_text_en: None,
            usage_guide: None,
            example_input: None,
            example_output: None,
            tips: None,
            variables: vec![PromptVariable {
                name: "topic".into(),
                description: Some("Subject of the post".into()),
                example: Some("rust".into()),
            }],
        }
    }

    fn create() -> CreatePromptRequest {
        CreatePromptRequest {
            title: "SEO Blog Writer".into(),
            slug: None,
            short_description: None,
            author_id: None,
            source_id: None,
            level_id: None,
            thumbnail_url: None,
            is_premium: false,
            ticket_cost: None,
            price_cents: 0,
            original_price_cents: None,
            category_codes: vec!["CA010".into()],
            tag_slugs: vec![],
            content: content(),
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in PromptStatus::all() {
            assert_eq!(status.as_str().parse::<PromptStatus>().unwrap(), *status);
        }
        assert!("suspended".parse::<PromptStatus>().is_err());
        assert_eq!(PromptStatus::Published.to_string(), "published");
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&PromptStatus::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
        let parsed: TransitionStatusRequest =
            serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert_eq!(parsed.status, PromptStatus::Pending);
        assert!(serde_json::from_str::<TransitionStatusRequest>(r#"{"status":"gone"}"#).is_err());
    }

    #[test]
    fn test_discount_percentage() {
        assert_eq!(discount_percentage(7500, Some(10000)), 25);
        assert_eq!(discount_percentage(10000, Some(10000)), 0);
        assert_eq!(discount_percentage(12000, Some(10000)), 0);
        assert_eq!(discount_percentage(100, None), 0);
        assert_eq!(discount_percentage(0, Some(0)), 0);
        assert_eq!(discount_percentage(6667, Some(10000)), 33);
    }

    #[test]
    fn test_create_request_validation() {
        assert!(create().validate().is_ok());

        let mut bad = create();
        bad.title = String::new();
        assert!(bad.validate().is_err());

        let mut bad = create();
        bad.slug = Some("Not A Slug".into());
        assert!(bad.validate().is_err());

        let mut bad = create();
        bad.price_cents = -1;
        assert!(bad.validate().is_err());

        let mut bad = create();
        bad.content.prompt_text = String::new();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_resolved_slug() {
        assert_eq!(create().resolved_slug().unwrap(), "seo-blog-writer");

        let mut explicit = create();
        explicit.slug = Some("custom-slug".into());
        assert_eq!(explicit.resolved_slug().unwrap(), "custom-slug");

        let mut unsluggable = create();
        unsluggable.title = "???".into();
        assert!(unsluggable.resolved_slug().is_err());
    }

    #[test]
    fn test_duplicate_variables_rejected() {
        let mut input = content();
        assert!(input.check_variables().is_ok());
        input.variables.push(input.variables[0].clone());
        assert!(matches!(
            input.check_variables(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_list_query_search_text() {
        let query = ListPromptsQuery {
            q: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(query.search_text(), None);

        let query = ListPromptsQuery {
            q: Some("  email  ".into()),
            ..Default::default()
        };
        assert_eq!(query.search_text(), Some("email"));
        assert_eq!(query.sort, PromptSort::Newest);
    }

    #[test]
    fn test_attach_model_score_range() {
        let ok = AttachAiModelRequest {
            compatibility_score: Some(10),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
        let bad = AttachAiModelRequest {
            compatibility_score: Some(11),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}

//! Taxonomy reference data: categories, tags, AI platforms/models,
//! prompt sources, levels and author profiles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(url(message = "Icon must be a valid URL"))]
    pub icon_url: Option<String>,

    #[validate(custom(function = "shared::validation::validate_color_hex"))]
    pub color_hex: Option<String>,

    pub parent_code: Option<String>,

    #[serde(default)]
    pub sort_order: i32,
}

/// Category update. `parent_code: Some("")` moves the category to the root.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(url)]
    pub icon_url: Option<String>,

    #[validate(custom(function = "shared::validation::validate_color_hex"))]
    pub color_hex: Option<String>,

    pub parent_code: Option<String>,

    pub sort_order: Option<i32>,

    pub is_active: Option<bool>,
}

/// Category with its children, for tree listings.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Builds a forest from a flat list ordered by `sort_order`.
    /// Rows whose parent is missing from the list become roots.
    pub fn build_forest(categories: Vec<Category>) -> Vec<CategoryNode> {
        use std::collections::{HashMap, HashSet};

        let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
        let mut children: HashMap<Uuid, Vec<Category>> = HashMap::new();
        let mut roots = Vec::new();

        for category in categories {
            match category.parent_id {
                Some(parent) if ids.contains(&parent) && parent != category.id => {
                    children.entry(parent).or_default().push(category)
                }
                _ => roots.push(category),
            }
        }

        fn attach(category: Category, children: &mut HashMap<Uuid, Vec<Category>>) -> CategoryNode {
            let kids = children.remove(&category.id).unwrap_or_default();
            CategoryNode {
                category,
                children: kids.into_iter().map(|c| attach(c, children)).collect(),
            }
        }

        roots
            .into_iter()
            .map(|c| attach(c, &mut children))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    /// Derived from the name when absent.
    #[validate(custom(function = "shared::validation::validate_slug"))]
    pub slug: Option<String>,
}

impl CreateTagRequest {
    pub fn resolved_slug(&self) -> String {
        self.slug
            .clone()
            .unwrap_or_else(|| shared::validation::slugify(&self.name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiPlatform {
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAiPlatformRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(max = 100))]
    pub company_name: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    #[validate(url)]
    pub logo_url: Option<String>,

    pub description: Option<String>,

    pub release_date: Option<NaiveDate>,

    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModel {
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAiModelRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(max = 50))]
    pub version: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,

    pub release_date: Option<NaiveDate>,

    #[serde(default)]
    pub is_latest: bool,
}

/// Where a prompt was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Original,
    Community,
    Curated,
    Imported,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Original => "original",
            SourceType::Community => "community",
            SourceType::Curated => "curated",
            SourceType::Imported => "imported",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(SourceType::Original),
            "community" => Ok(SourceType::Community),
            "curated" => Ok(SourceType::Curated),
            "imported" => Ok(SourceType::Imported),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSource {
    pub id: Uuid,
    pub name: String,
    pub url: Option<String>,
    pub source_type: SourceType,
    pub description: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePromptSourceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(url)]
    pub url: Option<String>,

    pub source_type: SourceType,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptLevel {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub requires_premium: bool,
    pub ticket_cost: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePromptLevelRequest {
    #[validate(length(min = 1, max = 30))]
    pub name: String,

    #[validate(length(max = 20))]
    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(max = 100))]
    pub description: Option<String>,

    #[serde(default)]
    pub requires_premium: bool,

    #[validate(range(min = 0, max = 1000, message = "Ticket cost must be 0-1000"))]
    #[serde(default)]
    pub ticket_cost: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptAuthor {
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePromptAuthorRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub user_id: Option<Uuid>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    #[serde(default = "empty_object")]
    pub social_links: serde_json::Value,

    pub bio: Option<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: Uuid, parent: Option<Uuid>, code: &str) -> Category {
        Category {
            id,
            parent_id: parent,
            name: code.to_uppercase(),
            code: code.into(),
            description: None,
            icon_url: None,
            color_hex: None,
            sort_order: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_forest_nests_children() {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let other = Uuid::new_v4();

        let forest = CategoryNode::build_forest(vec![
            category(root, None, "writing"),
            category(child, Some(root), "blog"),
            category(grandchild, Some(child), "seo"),
            category(other, None, "coding"),
        ]);

        assert_eq!(forest.len(), 2);
        let writing = forest.iter().find(|n| n.category.code == "writing").unwrap();
        assert_eq!(writing.children.len(), 1);
        assert_eq!(writing.children[0].children[0].category.code, "seo");
    }

    #[test]
    fn test_build_forest_orphans_become_roots() {
        let orphan = category(Uuid::new_v4(), Some(Uuid::new_v4()), "orphan");
        let forest = CategoryNode::build_forest(vec![orphan]);
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_create_category_validation() {
        let req = CreateCategoryRequest {
            name: "Test".into(),
            code: "CA010".into(),
            description: None,
            icon_url: None,
            color_hex: Some("#00AAFF".into()),
            parent_code: None,
            sort_order: 0,
        };
        assert!(req.validate().is_ok());

        let bad = CreateCategoryRequest {
            color_hex: Some("blue".into()),
            ..req
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_tag_slug_derived_from_name() {
        let req = CreateTagRequest {
            name: "Copy Writing".into(),
            slug: None,
        };
        assert_eq!(req.resolved_slug(), "copy-writing");
    }

    #[test]
    fn test_source_type_parse() {
        assert_eq!("Curated".parse::<SourceType>().unwrap(), SourceType::Curated);
        assert!("unknown".parse::<SourceType>().is_err());
    }
}

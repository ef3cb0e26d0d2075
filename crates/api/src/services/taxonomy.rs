//! Categories, tags, AI platforms and models, sources, levels and authors.
//!
//! Reads are open to anyone who may view the catalog; writes need
//! `taxonomy.manage`.

use domain::models::rbac::{codes, Actor, CrudAction};
use domain::models::taxonomy::{
    AiModel, AiPlatform, Category, CategoryNode, CreateAiModelRequest, CreateAiPlatformRequest,
    CreateCategoryRequest, CreatePromptAuthorRequest, CreatePromptLevelRequest,
    CreatePromptSourceRequest, CreateTagRequest, PromptAuthor, PromptLevel, PromptSource, Tag,
    UpdateCategoryRequest,
};
use domain::services::{authorize, ensure};
use domain::DomainError;
use persistence::repositories::{
    AiCatalogRepository, CategoryRepository, ReferenceRepository, TagRepository,
};
use sqlx::PgPool;

use crate::error::{ApiError, ApiResult};

const MAX_TAG_RESULTS: i64 = 100;

pub struct TaxonomyService {
    categories: CategoryRepository,
    tags: TagRepository,
    ai: AiCatalogRepository,
    references: ReferenceRepository,
}

impl TaxonomyService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            categories: CategoryRepository::new(pool.clone()),
            tags: TagRepository::new(pool.clone()),
            ai: AiCatalogRepository::new(pool.clone()),
            references: ReferenceRepository::new(pool),
        }
    }

    fn manage(actor: &Actor, action: CrudAction) -> ApiResult<()> {
        ensure(actor, codes::TAXONOMY_MANAGE, action, None)?;
        Ok(())
    }

    // ===========================================
    // Categories
    // ===========================================

    /// Category forest. Inactive categories are listed for managers only.
    pub async fn category_tree(&self, actor: &Actor) -> ApiResult<Vec<CategoryNode>> {
        let include_inactive = authorize(actor, codes::TAXONOMY_MANAGE, CrudAction::Read, None);
        let categories: Vec<Category> = self
            .categories
            .list(include_inactive)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(CategoryNode::build_forest(categories))
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        request: &CreateCategoryRequest,
    ) -> ApiResult<Category> {
        Self::manage(actor, CrudAction::Create)?;
        let category: Category = self.categories.create(request).await?.into();
        tracing::info!(target: "audit", actor = %actor.user_id, code = %category.code, "Category created");
        Ok(category)
    }

    /// Reparenting is refused when it would put the category under itself.
    pub async fn update_category(
        &self,
        actor: &Actor,
        code: &str,
        request: &UpdateCategoryRequest,
    ) -> ApiResult<Category> {
        Self::manage(actor, CrudAction::Update)?;
        Ok(self.categories.update(code, request).await?.into())
    }

    pub async fn delete_category(&self, actor: &Actor, code: &str) -> ApiResult<()> {
        Self::manage(actor, CrudAction::Delete)?;
        self.categories.delete(code).await?;
        tracing::info!(target: "audit", actor = %actor.user_id, code = %code, "Category deleted");
        Ok(())
    }

    // ===========================================
    // Tags
    // ===========================================

    pub async fn list_tags(&self, search: Option<&str>, limit: Option<i64>) -> ApiResult<Vec<Tag>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let limit = limit.unwrap_or(50).clamp(1, MAX_TAG_RESULTS);
        Ok(self
            .tags
            .list(search, limit)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_tag(&self, actor: &Actor, request: &CreateTagRequest) -> ApiResult<Tag> {
        Self::manage(actor, CrudAction::Create)?;
        let slug = request.resolved_slug();
        shared::validation::validate_slug(&slug)
            .map_err(|_| ApiError::Validation(format!("Cannot derive a valid slug from '{}'", request.name)))?;
        Ok(self.tags.create(request.name.trim(), &slug).await?.into())
    }

    // ===========================================
    // AI platforms and models
    // ===========================================

    pub async fn list_platforms(&self) -> ApiResult<Vec<AiPlatform>> {
        Ok(self
            .ai
            .list_platforms()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_platform(
        &self,
        actor: &Actor,
        request: &CreateAiPlatformRequest,
    ) -> ApiResult<AiPlatform> {
        Self::manage(actor, CrudAction::Create)?;
        Ok(self.ai.create_platform(request).await?.into())
    }

    pub async fn list_models(&self, platform_code: &str) -> ApiResult<Vec<AiModel>> {
        if self.ai.find_platform(platform_code).await?.is_none() {
            return Err(DomainError::not_found(format!("Platform {}", platform_code)).into());
        }
        Ok(self
            .ai
            .list_models(platform_code)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_model(
        &self,
        actor: &Actor,
        platform_code: &str,
        request: &CreateAiModelRequest,
    ) -> ApiResult<AiModel> {
        Self::manage(actor, CrudAction::Create)?;
        Ok(self.ai.create_model(platform_code, request).await?.into())
    }

    // ===========================================
    // Sources, levels and authors
    // ===========================================

    pub async fn list_sources(&self) -> ApiResult<Vec<PromptSource>> {
        Ok(self
            .references
            .list_sources()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_source(
        &self,
        actor: &Actor,
        request: &CreatePromptSourceRequest,
    ) -> ApiResult<PromptSource> {
        Self::manage(actor, CrudAction::Create)?;
        Ok(self.references.create_source(request).await?.into())
    }

    pub async fn list_levels(&self) -> ApiResult<Vec<PromptLevel>> {
        Ok(self
            .references
            .list_levels()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_level(
        &self,
        actor: &Actor,
        request: &CreatePromptLevelRequest,
    ) -> ApiResult<PromptLevel> {
        Self::manage(actor, CrudAction::Create)?;
        Ok(self.references.create_level(request).await?.into())
    }

    pub async fn list_authors(&self) -> ApiResult<Vec<PromptAuthor>> {
        Ok(self
            .references
            .list_authors()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_author(
        &self,
        actor: &Actor,
        request: &CreatePromptAuthorRequest,
    ) -> ApiResult<PromptAuthor> {
        Self::manage(actor, CrudAction::Create)?;
        Ok(self.references.create_author(request).await?.into())
    }
}

//! Prompt catalog: listing, detail, authoring, status workflow and links.
//!
//! Prompts that are not published (or are deactivated) are reported as not
//! found to everyone except their creator and staff.

use chrono::Utc;
use domain::models::commerce::{AccessDecision, UserSubscription};
use domain::models::engagement::ViewOutcome;
use domain::models::prompt::{
    AttachAiModelRequest, CreatePromptRequest, ListPromptsQuery, Prompt, PromptDetail,
    PromptStatus, PromptSummary, UpdatePromptRequest,
};
use domain::models::rbac::{codes, Actor, CrudAction};
use domain::models::system_config::{keys, ConfigSnapshot};
use domain::services::{
    authorize, authorize_transition, ensure, evaluate_access, is_staff, published_at_after,
    AccessInput,
};
use domain::DomainError;
use persistence::repositories::{
    CommerceRepository, InteractionRepository, NewPrompt, PromptRepository, ReferenceRepository,
};
use shared::pagination::{Page, PageRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::metrics::record_view;

/// Whether `actor` is a signed-in user rather than the guest stand-in.
pub fn is_authenticated(actor: &Actor) -> bool {
    !actor.user_id.is_nil()
}

fn is_owner(actor: &Actor, prompt: &Prompt) -> bool {
    is_authenticated(actor) && prompt.created_by == actor.user_id
}

/// Creator and staff see every prompt; everyone else only published ones.
pub fn can_see(actor: &Actor, prompt: &Prompt) -> bool {
    prompt.is_visible_to_public() || is_owner(actor, prompt) || is_staff(actor)
}

pub struct CatalogService {
    prompts: PromptRepository,
    references: ReferenceRepository,
    commerce: CommerceRepository,
    interactions: InteractionRepository,
    page_size: u32,
    max_page_size: u32,
}

impl CatalogService {
    pub fn new(pool: PgPool, catalog: &CatalogConfig, settings: &ConfigSnapshot) -> Self {
        let page_size = settings
            .get_i64(keys::CATALOG_PAGE_SIZE, i64::from(catalog.default_page_size))
            .clamp(1, i64::from(catalog.max_page_size.max(1))) as u32;
        Self {
            prompts: PromptRepository::new(pool.clone()),
            references: ReferenceRepository::new(pool.clone()),
            commerce: CommerceRepository::new(pool.clone()),
            interactions: InteractionRepository::new(pool),
            page_size,
            max_page_size: catalog.max_page_size,
        }
    }

    /// Loads a prompt the actor is allowed to know about.
    pub async fn find_visible(&self, actor: &Actor, slug: &str) -> ApiResult<Prompt> {
        ensure(actor, codes::PROMPT_VIEW, CrudAction::Read, None)?;
        let prompt: Prompt = self
            .prompts
            .find_by_slug(slug)
            .await?
            .map(Prompt::from)
            .filter(|p| can_see(actor, p))
            .ok_or_else(|| DomainError::not_found(format!("Prompt {}", slug)))?;
        Ok(prompt)
    }

    async fn find_any(&self, slug: &str) -> ApiResult<Prompt> {
        self.prompts
            .find_by_slug(slug)
            .await?
            .map(Prompt::from)
            .ok_or_else(|| DomainError::not_found(format!("Prompt {}", slug)).into())
    }

    /// Loads a prompt the actor may edit.
    async fn find_editable(&self, actor: &Actor, slug: &str) -> ApiResult<Prompt> {
        let prompt = self.find_any(slug).await?;
        if !can_see(actor, &prompt) {
            return Err(DomainError::not_found(format!("Prompt {}", slug)).into());
        }
        ensure(actor, codes::PROMPT_EDIT, CrudAction::Update, Some(prompt.created_by))?;
        Ok(prompt)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        query: &ListPromptsQuery,
    ) -> ApiResult<Page<PromptSummary>> {
        ensure(actor, codes::PROMPT_VIEW, CrudAction::Read, None)?;

        let own_listing = is_authenticated(actor) && query.created_by == Some(actor.user_id);
        let published_only = !(is_staff(actor) || own_listing);
        let page = PageRequest::new(
            query.page,
            Some(query.per_page.unwrap_or(self.page_size)),
            self.max_page_size,
        );

        let (rows, total) = self.prompts.list(query, published_only, page).await?;
        let items = rows
            .into_iter()
            .map(|e| PromptSummary::from(Prompt::from(e)))
            .collect();
        Ok(Page::new(items, page, total))
    }

    /// Access decision for a prompt the actor can already see.
    pub async fn access_for(&self, actor: &Actor, prompt: &Prompt) -> ApiResult<AccessDecision> {
        let now = Utc::now();
        if !is_authenticated(actor) {
            return Ok(evaluate_access(AccessInput {
                is_premium: prompt.is_premium,
                ticket_cost: prompt.ticket_cost,
                is_owner: false,
                already_purchased: false,
                subscription: None,
                now,
            }));
        }

        let (already_purchased, subscription) = tokio::try_join!(
            self.commerce.has_purchased(actor.user_id, prompt.id),
            self.commerce.current_subscription(actor.user_id, now),
        )?;
        let subscription: Option<UserSubscription> = subscription.map(Into::into);

        Ok(evaluate_access(AccessInput {
            is_premium: prompt.is_premium,
            ticket_cost: prompt.ticket_cost,
            is_owner: is_owner(actor, prompt),
            already_purchased,
            subscription: subscription.as_ref(),
            now,
        }))
    }

    /// Prompt with content and links. Premium content stays locked until the
    /// reader has bought or unlocked it, unless they may read all premium content.
    pub async fn detail(&self, actor: &Actor, slug: &str) -> ApiResult<PromptDetail> {
        let prompt = self.find_visible(actor, slug).await?;
        let id = prompt.id;

        let (content, categories, tags, models) = tokio::try_join!(
            self.prompts.content(id),
            self.prompts.categories(id),
            self.prompts.tags(id),
            self.prompts.models(id),
        )?;

        let unlocked = if !prompt.is_premium
            || is_owner(actor, &prompt)
            || is_staff(actor)
            || authorize(actor, codes::PROMPT_VIEW_PREMIUM, CrudAction::Read, None)
        {
            true
        } else {
            // Subscription access still has to be unlocked before it is shown.
            let decision = self.access_for(actor, &prompt).await?;
            decision.granted && !decision.charges_tickets()
        };

        let detail = PromptDetail {
            prompt,
            content: content.map(Into::into),
            locked: false,
            categories: categories.into_iter().map(Into::into).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
            models: models.into_iter().map(Into::into).collect(),
        };

        Ok(if unlocked { detail } else { detail.redact_content() })
    }

    pub async fn create(&self, actor: &Actor, request: &CreatePromptRequest) -> ApiResult<Prompt> {
        ensure(actor, codes::PROMPT_CREATE, CrudAction::Create, None)?;

        let slug = request.resolved_slug()?;
        shared::validation::validate_slug(&slug)
            .map_err(|_| ApiError::Validation(format!("Invalid slug: {}", slug)))?;
        let ticket_cost = self.ticket_cost_for(request.ticket_cost, request.level_id).await?;

        let prompt: Prompt = self
            .prompts
            .create(NewPrompt {
                request,
                slug: &slug,
                ticket_cost,
                created_by: actor.user_id,
            })
            .await?
            .into();

        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            prompt_id = %prompt.id,
            slug = %prompt.slug,
            "Prompt created"
        );
        Ok(prompt)
    }

    /// Explicit cost wins, then the level's default, then zero.
    async fn ticket_cost_for(&self, explicit: Option<i32>, level_id: Option<Uuid>) -> ApiResult<i32> {
        if let Some(cost) = explicit {
            return Ok(cost);
        }
        let Some(level_id) = level_id else {
            return Ok(0);
        };
        let level = self
            .references
            .find_level(level_id)
            .await?
            .ok_or_else(|| ApiError::Validation("Unknown prompt level".into()))?;
        Ok(level.ticket_cost)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        slug: &str,
        request: &UpdatePromptRequest,
    ) -> ApiResult<Prompt> {
        let prompt = self.find_editable(actor, slug).await?;
        if request.touches_staff_flags() {
            ensure(actor, codes::PROMPT_PUBLISH, CrudAction::Update, None)?;
        }

        let mut request = request.clone();
        if request.ticket_cost.is_none() && request.level_id.is_some() {
            request.ticket_cost = Some(self.ticket_cost_for(None, request.level_id).await?);
        }

        let updated: Prompt = self
            .prompts
            .update(prompt.id, actor.user_id, &request)
            .await?
            .into();
        Ok(updated)
    }

    /// Permission for the target status is checked before the state machine.
    pub async fn transition(
        &self,
        actor: &Actor,
        slug: &str,
        to: PromptStatus,
    ) -> ApiResult<Prompt> {
        let prompt = self.find_any(slug).await?;
        if !can_see(actor, &prompt) {
            return Err(DomainError::not_found(format!("Prompt {}", slug)).into());
        }

        let kind = authorize_transition(actor, prompt.created_by, prompt.status, to)?;
        let published_at = published_at_after(to, prompt.published_at, Utc::now());

        let updated: Prompt = self
            .prompts
            .transition_status(prompt.id, prompt.status, to, published_at, actor.user_id)
            .await?
            .into();

        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            prompt_id = %prompt.id,
            from = %prompt.status,
            to = %to,
            kind = ?kind,
            "Prompt status changed"
        );
        Ok(updated)
    }

    pub async fn delete(&self, actor: &Actor, slug: &str) -> ApiResult<()> {
        ensure(actor, codes::PROMPT_DELETE, CrudAction::Delete, None)?;
        let prompt = self.find_any(slug).await?;
        self.prompts.delete(prompt.id).await?;
        tracing::info!(
            target: "audit",
            actor = %actor.user_id,
            prompt_id = %prompt.id,
            slug = %slug,
            "Prompt deleted"
        );
        Ok(())
    }

    /// One call counts one view; signed-in readers also get a per-user count.
    pub async fn record_view(&self, actor: &Actor, slug: &str) -> ApiResult<ViewOutcome> {
        let prompt = self.find_visible(actor, slug).await?;
        let user = is_authenticated(actor).then_some(actor.user_id);
        let outcome = self.interactions.record_view(prompt.id, user).await?;
        record_view();
        Ok(outcome)
    }

    pub async fn record_share(&self, actor: &Actor, slug: &str) -> ApiResult<i32> {
        let prompt = self.find_visible(actor, slug).await?;
        self.prompts
            .increment_share(prompt.id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Prompt {}", slug)).into())
    }

    /// Links or unlinks a tag. Returns the tag's usage count afterwards.
    pub async fn set_tag(
        &self,
        actor: &Actor,
        slug: &str,
        tag_slug: &str,
        linked: bool,
    ) -> ApiResult<i32> {
        let prompt = self.find_editable(actor, slug).await?;
        Ok(self.prompts.set_tag(prompt.id, tag_slug, linked).await?)
    }

    pub async fn attach_category(
        &self,
        actor: &Actor,
        slug: &str,
        category_code: &str,
        is_primary: bool,
    ) -> ApiResult<Prompt> {
        let prompt = self.find_editable(actor, slug).await?;
        Ok(self
            .prompts
            .attach_category(prompt.id, category_code, is_primary)
            .await?
            .into())
    }

    pub async fn detach_category(
        &self,
        actor: &Actor,
        slug: &str,
        category_code: &str,
    ) -> ApiResult<Prompt> {
        let prompt = self.find_editable(actor, slug).await?;
        Ok(self
            .prompts
            .detach_category(prompt.id, category_code)
            .await?
            .into())
    }

    pub async fn attach_model(
        &self,
        actor: &Actor,
        slug: &str,
        model_id: Uuid,
        request: &AttachAiModelRequest,
    ) -> ApiResult<()> {
        let prompt = self.find_editable(actor, slug).await?;
        self.prompts.attach_model(prompt.id, model_id, request).await?;
        Ok(())
    }

    pub async fn detach_model(&self, actor: &Actor, slug: &str, model_id: Uuid) -> ApiResult<()> {
        let prompt = self.find_editable(actor, slug).await?;
        if !self.prompts.detach_model(prompt.id, model_id).await? {
            return Err(DomainError::not_found("Model is not linked to this prompt").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::rbac::{roles, CrudFlags, GrantSet, RoleRef, STAFF_LEVEL};

    fn actor(level: i32) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: "reader".into(),
            roles: vec![RoleRef {
                code: roles::MEMBER.into(),
                level,
            }],
            grants: [(codes::PROMPT_VIEW.to_string(), CrudFlags::READ_ONLY)]
                .into_iter()
                .collect::<GrantSet>(),
        }
    }

    fn prompt(status: PromptStatus, created_by: Uuid) -> Prompt {
        let now = Utc::now();
        Prompt {
            id: Uuid::new_v4(),
            title: "Blog outline".into(),
            slug: "blog-outline".into(),
            short_description: None,
            author_id: None,
            source_id: None,
            level_id: None,
            primary_category_id: None,
            thumbnail_url: None,
            status,
            is_premium: false,
            ticket_cost: 0,
            price_cents: 0,
            original_price_cents: None,
            is_featured: false,
            is_verified: false,
            view_count: 0,
            like_count: 0,
            save_count: 0,
            share_count: 0,
            comment_count: 0,
            rating_sum: 0,
            rating_count: 0,
            average_rating: 0.0,
            published_at: None,
            created_by,
            updated_by: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_published_visible_to_everyone() {
        let reader = actor(2);
        assert!(can_see(&reader, &prompt(PromptStatus::Published, Uuid::new_v4())));
    }

    #[test]
    fn test_draft_visible_to_owner_and_staff_only() {
        let owner = actor(2);
        let draft = prompt(PromptStatus::Draft, owner.user_id);

        assert!(can_see(&owner, &draft));
        assert!(!can_see(&actor(2), &draft));
        assert!(can_see(&actor(STAFF_LEVEL), &draft));
    }

    #[test]
    fn test_guest_never_owns() {
        let mut guest = actor(1);
        guest.user_id = Uuid::nil();
        let orphan = prompt(PromptStatus::Draft, Uuid::nil());

        assert!(!is_authenticated(&guest));
        assert!(!can_see(&guest, &orphan));
    }

    #[test]
    fn test_deactivated_prompt_hidden() {
        let mut p = prompt(PromptStatus::Published, Uuid::new_v4());
        p.is_active = false;
        assert!(!can_see(&actor(2), &p));
    }
}

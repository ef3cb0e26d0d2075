//! Plans, subscriptions, ticket unlocks and direct purchases.

use chrono::Utc;
use domain::models::commerce::{
    AccessDecision, AccessReason, CreatePlanRequest, Purchase, PurchaseRecord, PurchaseRequest,
    SubscriptionPlan, UnlockResult, UpdatePlanRequest, UserSubscription,
};
use domain::models::rbac::{codes, Actor, CrudAction};
use domain::models::system_config::{keys, ConfigSnapshot};
use domain::services::{authorize, ensure, CatalogEvent, EventPublisher};
use domain::DomainError;
use persistence::repositories::{CommerceRepository, PromptAccessFacts};
use shared::pagination::{Page, PageRequest};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::{CatalogConfig, CommerceConfig};
use crate::error::{ApiError, ApiResult};
use crate::middleware::metrics::{record_purchase, record_unlock};
use crate::services::catalog::CatalogService;

pub struct CommerceService {
    commerce: CommerceRepository,
    catalog: CatalogService,
    events: Arc<dyn EventPublisher>,
    one_purchase_per_prompt: bool,
    max_page_size: u32,
}

impl CommerceService {
    pub fn new(
        pool: PgPool,
        commerce: &CommerceConfig,
        catalog: &CatalogConfig,
        settings: &ConfigSnapshot,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            commerce: CommerceRepository::new(pool.clone()),
            catalog: CatalogService::new(pool, catalog, settings),
            events,
            one_purchase_per_prompt: settings
                .get_bool(keys::ONE_PURCHASE_PER_PROMPT, commerce.one_purchase_per_prompt),
            max_page_size: catalog.max_page_size,
        }
    }

    // ===========================================
    // Plans
    // ===========================================

    /// Active plans; managers also see inactive ones.
    pub async fn list_plans(&self, actor: &Actor) -> ApiResult<Vec<SubscriptionPlan>> {
        let include_inactive = authorize(actor, codes::COMMERCE_MANAGE, CrudAction::Read, None);
        Ok(self
            .commerce
            .list_plans(include_inactive)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn create_plan(
        &self,
        actor: &Actor,
        request: &CreatePlanRequest,
    ) -> ApiResult<SubscriptionPlan> {
        ensure(actor, codes::COMMERCE_MANAGE, CrudAction::Create, None)?;
        let plan: SubscriptionPlan = self.commerce.create_plan(request).await?.into();
        tracing::info!(target: "audit", actor = %actor.user_id, plan = %plan.code, "Plan created");
        Ok(plan)
    }

    pub async fn update_plan(
        &self,
        actor: &Actor,
        code: &str,
        request: &UpdatePlanRequest,
    ) -> ApiResult<SubscriptionPlan> {
        ensure(actor, codes::COMMERCE_MANAGE, CrudAction::Update, None)?;
        let plan: SubscriptionPlan = self.commerce.update_plan(code, request).await?.into();
        tracing::info!(target: "audit", actor = %actor.user_id, plan = %code, "Plan updated");
        Ok(plan)
    }

    // ===========================================
    // Subscriptions
    // ===========================================

    pub async fn subscribe(&self, actor: &Actor, plan_code: &str) -> ApiResult<UserSubscription> {
        Ok(self
            .commerce
            .subscribe(actor.user_id, plan_code, Utc::now())
            .await?
            .into())
    }

    pub async fn current_subscription(&self, actor: &Actor) -> ApiResult<UserSubscription> {
        self.commerce
            .current_subscription(actor.user_id, Utc::now())
            .await?
            .map(UserSubscription::from)
            .ok_or_else(|| DomainError::not_found("No active subscription").into())
    }

    // ===========================================
    // Access
    // ===========================================

    pub async fn can_access(&self, actor: &Actor, slug: &str) -> ApiResult<AccessDecision> {
        let prompt = self.catalog.find_visible(actor, slug).await?;
        self.catalog.access_for(actor, &prompt).await
    }

    /// Spends subscription tickets on a premium prompt. Already-owned and free
    /// prompts are granted without a charge.
    pub async fn unlock(&self, actor: &Actor, slug: &str) -> ApiResult<UnlockResult> {
        let prompt = self.catalog.find_visible(actor, slug).await?;
        let result = self
            .commerce
            .unlock(
                actor.user_id,
                PromptAccessFacts {
                    prompt_id: prompt.id,
                    created_by: prompt.created_by,
                    is_premium: prompt.is_premium,
                    ticket_cost: prompt.ticket_cost,
                },
                Utc::now(),
            )
            .await?;

        if !result.decision.granted {
            record_unlock("refused");
            return Err(refusal(&result.decision));
        }

        match &result.purchase {
            Some(purchase) => {
                record_unlock("charged");
                self.completed(purchase);
            }
            None => record_unlock("granted"),
        }
        Ok(result)
    }

    /// Direct purchase at the prompt's listed price. Only commerce managers may
    /// record a different price.
    pub async fn purchase(
        &self,
        actor: &Actor,
        slug: &str,
        request: &PurchaseRequest,
    ) -> ApiResult<Purchase> {
        let prompt = self.catalog.find_visible(actor, slug).await?;
        if prompt.created_by == actor.user_id {
            return Err(DomainError::AlreadyOwned("You created this prompt".into()).into());
        }

        let price = purchase_price(actor, prompt.price_cents, request.price_paid_cents)?;
        let purchase: Purchase = self
            .commerce
            .purchase(
                actor.user_id,
                prompt.id,
                price,
                self.one_purchase_per_prompt,
                Utc::now(),
            )
            .await?
            .into();

        self.completed(&purchase);
        Ok(purchase)
    }

    pub async fn purchases(
        &self,
        actor: &Actor,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> ApiResult<Page<PurchaseRecord>> {
        let request = PageRequest::new(page, per_page, self.max_page_size);
        let (rows, total) = self
            .commerce
            .purchases_for_user(actor.user_id, request)
            .await?;
        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            request,
            total,
        ))
    }

    fn completed(&self, purchase: &Purchase) {
        record_purchase(purchase.tickets_spent);
        tracing::info!(
            user_id = %purchase.user_id,
            prompt_id = %purchase.prompt_id,
            transaction_id = %purchase.transaction_id,
            tickets_spent = purchase.tickets_spent,
            "Purchase completed"
        );
        self.events.publish(CatalogEvent::PurchaseCompleted {
            purchase_id: purchase.id,
            user_id: purchase.user_id,
            prompt_id: purchase.prompt_id,
            transaction_id: purchase.transaction_id.clone(),
            price_paid_cents: purchase.price_paid_cents,
            tickets_spent: purchase.tickets_spent,
            occurred_at: purchase.created_at,
        });
    }
}

/// Maps a refused decision: missing tickets or subscription is 402, a plan
/// that does not cover premium content is 403.
pub fn refusal(decision: &AccessDecision) -> ApiError {
    match decision.reason {
        AccessReason::InsufficientTickets => DomainError::InsufficientTickets {
            required: decision.ticket_cost,
            available: decision.tickets_available.unwrap_or(0),
        }
        .into(),
        AccessReason::PlanExcludesPremium => {
            ApiError::Forbidden("Your plan does not include premium prompts".into())
        }
        _ => ApiError::PaymentRequired("An active subscription is required".into()),
    }
}

/// The price a purchase is recorded at.
fn purchase_price(actor: &Actor, listed: i64, requested: Option<i64>) -> ApiResult<i64> {
    match requested {
        Some(price) if price != listed => {
            ensure(actor, codes::COMMERCE_MANAGE, CrudAction::Update, None)?;
            Ok(price)
        }
        _ => Ok(listed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use domain::models::rbac::{CrudFlags, GrantSet};
    use uuid::Uuid;

    fn refused(reason: AccessReason) -> AccessDecision {
        AccessDecision {
            granted: false,
            reason,
            ticket_cost: 5,
            tickets_available: Some(2),
        }
    }

    #[test]
    fn test_refusal_statuses() {
        let status = |reason| refusal(&refused(reason)).into_response().status();
        assert_eq!(
            status(AccessReason::InsufficientTickets),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status(AccessReason::NoSubscription), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(status(AccessReason::PlanExcludesPremium), StatusCode::FORBIDDEN);
    }

    fn actor_with(grants: GrantSet) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: "buyer".into(),
            roles: vec![],
            grants,
        }
    }

    #[test]
    fn test_purchase_price_override_needs_commerce_manage() {
        let member = actor_with(GrantSet::new());
        assert_eq!(purchase_price(&member, 149_000, None).unwrap(), 149_000);
        assert_eq!(purchase_price(&member, 149_000, Some(149_000)).unwrap(), 149_000);
        let denied = purchase_price(&member, 149_000, Some(0)).unwrap_err();
        assert_eq!(denied.into_response().status(), StatusCode::FORBIDDEN);

        let mut grants = GrantSet::new();
        grants.merge(codes::COMMERCE_MANAGE, CrudFlags::ALL);
        let manager = actor_with(grants);
        assert_eq!(purchase_price(&manager, 149_000, Some(0)).unwrap(), 0);
    }

    #[test]
    fn test_insufficient_tickets_message_has_counts() {
        let message = refusal(&refused(AccessReason::InsufficientTickets)).to_string();
        assert!(message.contains('5'));
        assert!(message.contains('2'));
    }
}

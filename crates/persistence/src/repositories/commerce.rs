//! Commerce repository: subscription plans, user subscriptions and the
//! purchase ledger.

use chrono::{DateTime, Utc};
use domain::models::commerce::{
    AccessReason, CreatePlanRequest, SubscriptionPlan, UnlockResult, UpdatePlanRequest,
    UserSubscription,
};
use domain::services::{evaluate_access, AccessInput};
use domain::DomainError;
use shared::pagination::PageRequest;
use shared::transaction::generate_transaction_id;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{
    PlanTypeDb, PurchaseEntity, PurchaseRecordEntity, SubscriptionPlanEntity,
    UserSubscriptionEntity,
};
use crate::error::{sqlstate, RepositoryError, RepositoryResult, UNIQUE_VIOLATION};
use crate::metrics::QueryTimer;

const PLAN_COLUMNS: &str = r#"
    id, name, code, plan_type, duration_days, ticket_amount, price_cents, discount_percent,
    features, max_prompts_per_day, can_access_premium, can_download, can_use_api, sort_order,
    is_popular, is_active, created_at
"#;

const SUBSCRIPTION_SELECT: &str = r#"
    SELECT us.id, us.user_id, us.plan_id, sp.code AS plan_code, sp.can_access_premium,
           us.ticket_balance, us.status, us.started_at, us.expires_at
    FROM user_subscriptions us
    JOIN subscription_plans sp ON sp.id = us.plan_id
"#;

const PURCHASE_COLUMNS: &str =
    "id, user_id, prompt_id, price_paid_cents, tickets_spent, transaction_id, created_at";

/// The facts about a prompt that purchase and unlock decisions need.
#[derive(Debug, Clone, Copy)]
pub struct PromptAccessFacts {
    pub prompt_id: Uuid,
    pub created_by: Uuid,
    pub is_premium: bool,
    pub ticket_cost: i32,
}

#[derive(Clone)]
pub struct CommerceRepository {
    pool: PgPool,
}

impl CommerceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ===========================================
    // Plans
    // ===========================================

    pub async fn list_plans(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<SubscriptionPlanEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_plans");
        let result = sqlx::query_as::<_, SubscriptionPlanEntity>(&format!(
            "SELECT {PLAN_COLUMNS} FROM subscription_plans WHERE ($1 OR is_active) ORDER BY sort_order, price_cents"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_plan_by_code(
        &self,
        code: &str,
    ) -> Result<Option<SubscriptionPlanEntity>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionPlanEntity>(&format!(
            "SELECT {PLAN_COLUMNS} FROM subscription_plans WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create_plan(
        &self,
        request: &CreatePlanRequest,
    ) -> RepositoryResult<SubscriptionPlanEntity> {
        let timer = QueryTimer::new("create_plan");
        let result = sqlx::query_as::<_, SubscriptionPlanEntity>(&format!(
            r#"
            INSERT INTO subscription_plans (
                name, code, plan_type, duration_days, ticket_amount, price_cents, discount_percent,
                features, max_prompts_per_day, can_access_premium, can_download, can_use_api,
                sort_order, is_popular
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(&request.code)
        .bind(PlanTypeDb::from(request.plan_type))
        .bind(request.duration_days)
        .bind(request.ticket_amount)
        .bind(request.price_cents)
        .bind(request.discount_percent)
        .bind(&request.features)
        .bind(request.max_prompts_per_day)
        .bind(request.can_access_premium)
        .bind(request.can_download)
        .bind(request.can_use_api)
        .bind(request.sort_order)
        .bind(request.is_popular)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(|e| RepositoryError::from_write(e, "Plan"))
    }

    pub async fn update_plan(
        &self,
        code: &str,
        request: &UpdatePlanRequest,
    ) -> RepositoryResult<SubscriptionPlanEntity> {
        let timer = QueryTimer::new("update_plan");
        let result = sqlx::query_as::<_, SubscriptionPlanEntity>(&format!(
            r#"
            UPDATE subscription_plans SET
                name = COALESCE($2, name),
                duration_days = COALESCE($3, duration_days),
                ticket_amount = COALESCE($4, ticket_amount),
                price_cents = COALESCE($5, price_cents),
                discount_percent = COALESCE($6, discount_percent),
                features = COALESCE($7, features),
                can_access_premium = COALESCE($8, can_access_premium),
                can_download = COALESCE($9, can_download),
                can_use_api = COALESCE($10, can_use_api),
                sort_order = COALESCE($11, sort_order),
                is_popular = COALESCE($12, is_popular),
                is_active = COALESCE($13, is_active)
            WHERE code = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(request.name.as_deref())
        .bind(request.duration_days)
        .bind(request.ticket_amount)
        .bind(request.price_cents)
        .bind(request.discount_percent)
        .bind(request.features.as_ref())
        .bind(request.can_access_premium)
        .bind(request.can_download)
        .bind(request.can_use_api)
        .bind(request.sort_order)
        .bind(request.is_popular)
        .bind(request.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(|e| RepositoryError::from_write(e, "Plan"))?
            .ok_or_else(|| RepositoryError::not_found(format!("Plan {code}")))
    }

    // ===========================================
    // Subscriptions
    // ===========================================

    /// Subscribe a user to a plan.
    ///
    /// The current active subscription, if any, is cancelled and its unused
    /// tickets carry over when it has not yet expired.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        plan_code: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<UserSubscriptionEntity> {
        let timer = QueryTimer::new("subscribe");
        let mut tx = self.pool.begin().await?;

        let plan: SubscriptionPlan = sqlx::query_as::<_, SubscriptionPlanEntity>(&format!(
            "SELECT {PLAN_COLUMNS} FROM subscription_plans WHERE code = $1 AND is_active"
        ))
        .bind(plan_code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::not_found(format!("Plan {plan_code}")))?
        .into();

        let carried = match active_subscription_in(&mut tx, user_id).await? {
            Some(current) => {
                sqlx::query(
                    "UPDATE user_subscriptions SET status = 'cancelled', updated_at = NOW() WHERE id = $1",
                )
                .bind(current.id)
                .execute(&mut *tx)
                .await?;
                let current: UserSubscription = current.into();
                if current.is_current(now) {
                    current.ticket_balance
                } else {
                    0
                }
            }
            None => 0,
        };

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO user_subscriptions
                (user_id, plan_id, ticket_balance, price_paid_cents, status, started_at, expires_at)
            VALUES ($1, $2, $3, $4, 'active', $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(plan.id)
        .bind(plan.ticket_amount.saturating_add(carried))
        .bind(plan.effective_price_cents())
        .bind(now)
        .bind(plan.expires_at(now))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Subscription"))?;

        let entity = sqlx::query_as::<_, UserSubscriptionEntity>(&format!(
            "{SUBSCRIPTION_SELECT} WHERE us.id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        tracing::info!(
            user_id = %user_id,
            plan = %plan.code,
            carried_tickets = carried,
            "Subscription started"
        );
        Ok(entity)
    }

    /// The user's active, unexpired subscription.
    pub async fn current_subscription(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("current_subscription");
        let result = sqlx::query_as::<_, UserSubscriptionEntity>(&format!(
            "{SUBSCRIPTION_SELECT} WHERE us.user_id = $1 AND us.status = 'active' AND us.expires_at > $2"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark lapsed active subscriptions as expired. Returns how many changed.
    pub async fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("expire_subscriptions");
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn count_active_subscriptions(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_subscriptions WHERE status = 'active' AND expires_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await
    }

    // ===========================================
    // Purchases
    // ===========================================

    pub async fn has_purchased(&self, user_id: Uuid, prompt_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = $1 AND prompt_id = $2)",
        )
        .bind(user_id)
        .bind(prompt_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Record a direct purchase. With `one_per_prompt`, a second purchase of
    /// the same prompt by the same user is refused with `AlreadyOwned`.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        prompt_id: Uuid,
        price_paid_cents: i64,
        one_per_prompt: bool,
        now: DateTime<Utc>,
    ) -> RepositoryResult<PurchaseEntity> {
        let timer = QueryTimer::new("purchase_prompt");
        let mut tx = self.pool.begin().await?;

        lock_pair_in(&mut tx, user_id, prompt_id).await?;

        if one_per_prompt && purchased_in(&mut tx, user_id, prompt_id).await? {
            return Err(DomainError::AlreadyOwned("Prompt already purchased".to_string()).into());
        }

        let entity = insert_purchase_in(&mut tx, user_id, prompt_id, price_paid_cents, 0, now).await?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Unlock a prompt for a user.
    ///
    /// Locks the user's active subscription, evaluates access and, when the
    /// subscription pays, decrements the ticket balance and records a zero-price
    /// purchase in the same transaction. A refused decision is returned as-is
    /// with nothing written.
    pub async fn unlock(
        &self,
        user_id: Uuid,
        prompt: PromptAccessFacts,
        now: DateTime<Utc>,
    ) -> RepositoryResult<UnlockResult> {
        let timer = QueryTimer::new("unlock_prompt");
        let mut tx = self.pool.begin().await?;

        lock_pair_in(&mut tx, user_id, prompt.prompt_id).await?;
        let already_purchased = purchased_in(&mut tx, user_id, prompt.prompt_id).await?;
        let subscription: Option<UserSubscription> = active_subscription_in(&mut tx, user_id)
            .await?
            .map(Into::into);

        let decision = evaluate_access(AccessInput {
            is_premium: prompt.is_premium,
            ticket_cost: prompt.ticket_cost,
            is_owner: prompt.created_by == user_id,
            already_purchased,
            subscription: subscription.as_ref(),
            now,
        });

        if !decision.granted || decision.reason != AccessReason::Subscription {
            tx.commit().await?;
            timer.record();
            return Ok(UnlockResult {
                decision,
                purchase: None,
                tickets_remaining: decision.tickets_available,
            });
        }

        let Some(subscription) = subscription else {
            return Err(DomainError::Internal("Granted without a subscription".to_string()).into());
        };

        let remaining = if decision.charges_tickets() {
            sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE user_subscriptions
                SET ticket_balance = ticket_balance - $2, updated_at = NOW()
                WHERE id = $1 AND ticket_balance >= $2
                RETURNING ticket_balance
                "#,
            )
            .bind(subscription.id)
            .bind(prompt.ticket_cost)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::InsufficientTickets {
                required: prompt.ticket_cost,
                available: subscription.ticket_balance,
            })?
        } else {
            subscription.ticket_balance
        };

        let purchase = insert_purchase_in(
            &mut tx,
            user_id,
            prompt.prompt_id,
            0,
            prompt.ticket_cost,
            now,
        )
        .await?;

        tx.commit().await?;
        timer.record();

        Ok(UnlockResult {
            decision,
            purchase: Some(purchase.into()),
            tickets_remaining: Some(remaining),
        })
    }

    /// A user's purchases with prompt titles, newest first.
    pub async fn purchases_for_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<PurchaseRecordEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_user_purchases");
        let items = sqlx::query_as::<_, PurchaseRecordEntity>(
            r#"
            SELECT pu.id, pu.user_id, pu.prompt_id, pu.price_paid_cents, pu.tickets_spent,
                   pu.transaction_id, pu.created_at,
                   p.title AS prompt_title, p.slug AS prompt_slug
            FROM purchases pu
            JOIN prompts p ON p.id = pu.prompt_id
            WHERE pu.user_id = $1
            ORDER BY pu.created_at DESC, pu.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM purchases WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        timer.record();
        Ok((items, total))
    }
}

/// Serializes purchase and unlock attempts for one (user, prompt) pair.
async fn lock_pair_in(conn: &mut PgConnection, user_id: Uuid, prompt_id: Uuid) -> RepositoryResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2::text, 0))")
        .bind(user_id)
        .bind(prompt_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn purchased_in(conn: &mut PgConnection, user_id: Uuid, prompt_id: Uuid) -> RepositoryResult<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM purchases WHERE user_id = $1 AND prompt_id = $2)",
    )
    .bind(user_id)
    .bind(prompt_id)
    .fetch_one(conn)
    .await?)
}

async fn active_subscription_in(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> RepositoryResult<Option<UserSubscriptionEntity>> {
    Ok(sqlx::query_as::<_, UserSubscriptionEntity>(&format!(
        "{SUBSCRIPTION_SELECT} WHERE us.user_id = $1 AND us.status = 'active' FOR UPDATE OF us"
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await?)
}

async fn insert_purchase_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    prompt_id: Uuid,
    price_paid_cents: i64,
    tickets_spent: i32,
    now: DateTime<Utc>,
) -> RepositoryResult<PurchaseEntity> {
    sqlx::query_as::<_, PurchaseEntity>(&format!(
        r#"
        INSERT INTO purchases (user_id, prompt_id, price_paid_cents, tickets_spent, transaction_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PURCHASE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(prompt_id)
    .bind(price_paid_cents)
    .bind(tickets_spent)
    .bind(generate_transaction_id(now))
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match sqlstate(&e).as_deref() {
        Some(UNIQUE_VIOLATION) => {
            tracing::warn!(user_id = %user_id, prompt_id = %prompt_id, "Purchase insert raced");
            DomainError::Conflict("Purchase could not be recorded, please retry".to_string()).into()
        }
        _ => RepositoryError::from_write(e, "Purchase"),
    })
}

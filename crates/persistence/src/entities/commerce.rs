//! Commerce entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::commerce::{
    PlanType, Purchase, PurchaseRecord, SubscriptionPlan, SubscriptionStatus, UserSubscription,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for plan_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "plan_type", rename_all = "snake_case")]
pub enum PlanTypeDb {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl From<PlanTypeDb> for PlanType {
    fn from(db: PlanTypeDb) -> Self {
        match db {
            PlanTypeDb::Free => Self::Free,
            PlanTypeDb::Basic => Self::Basic,
            PlanTypeDb::Pro => Self::Pro,
            PlanTypeDb::Enterprise => Self::Enterprise,
        }
    }
}

impl From<PlanType> for PlanTypeDb {
    fn from(domain: PlanType) -> Self {
        match domain {
            PlanType::Free => Self::Free,
            PlanType::Basic => Self::Basic,
            PlanType::Pro => Self::Pro,
            PlanType::Enterprise => Self::Enterprise,
        }
    }
}

/// Database enum for subscription_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
pub enum SubscriptionStatusDb {
    Active,
    Cancelled,
    Expired,
}

impl From<SubscriptionStatusDb> for SubscriptionStatus {
    fn from(db: SubscriptionStatusDb) -> Self {
        match db {
            SubscriptionStatusDb::Active => Self::Active,
            SubscriptionStatusDb::Cancelled => Self::Cancelled,
            SubscriptionStatusDb::Expired => Self::Expired,
        }
    }
}

/// Database row mapping for the subscription_plans table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionPlanEntity {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub plan_type: PlanTypeDb,
    pub duration_days: i32,
    pub ticket_amount: i32,
    pub price_cents: i64,
    pub discount_percent: i16,
    pub features: serde_json::Value,
    pub max_prompts_per_day: Option<i32>,
    pub can_access_premium: bool,
    pub can_download: bool,
    pub can_use_api: bool,
    pub sort_order: i32,
    pub is_popular: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionPlanEntity> for SubscriptionPlan {
    fn from(entity: SubscriptionPlanEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            code: entity.code,
            plan_type: entity.plan_type.into(),
            duration_days: entity.duration_days,
            ticket_amount: entity.ticket_amount,
            price_cents: entity.price_cents,
            discount_percent: entity.discount_percent,
            features: entity.features,
            max_prompts_per_day: entity.max_prompts_per_day,
            can_access_premium: entity.can_access_premium,
            can_download: entity.can_download,
            can_use_api: entity.can_use_api,
            sort_order: entity.sort_order,
            is_popular: entity.is_popular,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// A user_subscriptions row joined with its plan's code and premium flag.
#[derive(Debug, Clone, FromRow)]
pub struct UserSubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub plan_code: String,
    pub can_access_premium: bool,
    pub ticket_balance: i32,
    pub status: SubscriptionStatusDb,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<UserSubscriptionEntity> for UserSubscription {
    fn from(entity: UserSubscriptionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            plan_id: entity.plan_id,
            plan_code: entity.plan_code,
            can_access_premium: entity.can_access_premium,
            ticket_balance: entity.ticket_balance,
            status: entity.status.into(),
            started_at: entity.started_at,
            expires_at: entity.expires_at,
        }
    }
}

/// Database row mapping for the purchases table.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt_id: Uuid,
    pub price_paid_cents: i64,
    pub tickets_spent: i32,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<PurchaseEntity> for Purchase {
    fn from(entity: PurchaseEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            prompt_id: entity.prompt_id,
            price_paid_cents: entity.price_paid_cents,
            tickets_spent: entity.tickets_spent,
            transaction_id: entity.transaction_id,
            created_at: entity.created_at,
        }
    }
}

/// Purchase joined with the prompt's title and slug.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRecordEntity {
    #[sqlx(flatten)]
    pub purchase: PurchaseEntity,
    pub prompt_title: String,
    pub prompt_slug: String,
}

impl From<PurchaseRecordEntity> for PurchaseRecord {
    fn from(entity: PurchaseRecordEntity) -> Self {
        Self {
            purchase: entity.purchase.into(),
            prompt_title: entity.prompt_title,
            prompt_slug: entity.prompt_slug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_type_round_trip() {
        for plan_type in [
            PlanType::Free,
            PlanType::Basic,
            PlanType::Pro,
            PlanType::Enterprise,
        ] {
            let db: PlanTypeDb = plan_type.into();
            assert_eq!(PlanType::from(db), plan_type);
        }
    }

    #[test]
    fn test_purchase_record_flattens() {
        let entity = PurchaseRecordEntity {
            purchase: PurchaseEntity {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                prompt_id: Uuid::new_v4(),
                price_paid_cents: 4900,
                tickets_spent: 0,
                transaction_id: "TXN-20240101-ABCDEFGHJKLM".into(),
                created_at: Utc::now(),
            },
            prompt_title: "Cold Email".into(),
            prompt_slug: "cold-email".into(),
        };
        let record: PurchaseRecord = entity.into();
        assert_eq!(record.purchase.price_paid_cents, 4900);
        assert_eq!(record.prompt_slug, "cold-email");
    }
}

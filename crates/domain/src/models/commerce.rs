//! Commerce models: subscription plans, user subscriptions, purchases and access decisions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Basic => "basic",
            PlanType::Pro => "pro",
            PlanType::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(PlanType::Free),
            "basic" => Ok(PlanType::Basic),
            "pro" => Ok(PlanType::Pro),
            "enterprise" => Ok(PlanType::Enterprise),
            _ => Err(format!("Unknown plan type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub plan_type: PlanType,
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

impl SubscriptionPlan {
    /// Price after the plan discount, rounded down.
    pub fn effective_price_cents(&self) -> i64 {
        let discount = i64::from(self.discount_percent.clamp(0, 100));
        self.price_cents * (100 - discount) / 100
    }

    pub fn expires_at(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + Duration::days(i64::from(self.duration_days))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 30))]
    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    pub plan_type: PlanType,

    #[validate(range(min = 1, max = 36500, message = "Duration must be 1-36500 days"))]
    pub duration_days: i32,

    #[validate(range(min = 0, message = "Ticket amount cannot be negative"))]
    pub ticket_amount: i32,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: i64,

    #[validate(range(min = 0, max = 100, message = "Discount must be 0-100"))]
    #[serde(default)]
    pub discount_percent: i16,

    #[serde(default = "empty_features")]
    pub features: serde_json::Value,

    #[validate(range(min = 1))]
    pub max_prompts_per_day: Option<i32>,

    #[serde(default)]
    pub can_access_premium: bool,
    #[serde(default)]
    pub can_download: bool,
    #[serde(default)]
    pub can_use_api: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_popular: bool,
}

fn empty_features() -> serde_json::Value {
    serde_json::json!([])
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(range(min = 1, max = 36500))]
    pub duration_days: Option<i32>,

    #[validate(range(min = 0))]
    pub ticket_amount: Option<i32>,

    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,

    #[validate(range(min = 0, max = 100))]
    pub discount_percent: Option<i16>,

    pub features: Option<serde_json::Value>,
    pub can_access_premium: Option<bool>,
    pub can_download: Option<bool>,
    pub can_use_api: Option<bool>,
    pub sort_order: Option<i32>,
    pub is_popular: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

/// A user's subscription with its ticket balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub plan_code: String,
    pub can_access_premium: bool,
    pub ticket_balance: i32,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UserSubscription {
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at > now
    }
}

/// Ledger entry recording a user's acquisition of a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt_id: Uuid,
    pub price_paid_cents: i64,
    pub tickets_spent: i32,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

/// Purchase history row.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRecord {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub prompt_title: String,
    pub prompt_slug: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PurchaseRequest {
    /// Defaults to the listed price. Recording another price needs `commerce.manage`.
    #[validate(range(min = 0, message = "Price paid cannot be negative"))]
    pub price_paid_cents: Option<i64>,
}

/// Why access was granted or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    /// Prompt is not premium.
    Free,
    Owner,
    AlreadyPurchased,
    /// Active premium subscription with enough tickets; unlocking charges them.
    Subscription,
    NoSubscription,
    PlanExcludesPremium,
    InsufficientTickets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub granted: bool,
    pub reason: AccessReason,
    pub ticket_cost: i32,
    pub tickets_available: Option<i32>,
}

impl AccessDecision {
    /// Whether granting this decision consumes tickets.
    pub fn charges_tickets(&self) -> bool {
        self.granted && self.reason == AccessReason::Subscription && self.ticket_cost > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlockResult {
    pub decision: AccessDecision,
    pub purchase: Option<Purchase>,
    pub tickets_remaining: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Pro".into(),
            code: "PRO_MONTH".into(),
            plan_type: PlanType::Pro,
            duration_days: 30,
            ticket_amount: 200,
            price_cents: 149000,
            discount_percent: 10,
            features: serde_json::json!(["premium"]),
            max_prompts_per_day: None,
            can_access_premium: true,
            can_download: true,
            can_use_api: false,
            sort_order: 3,
            is_popular: true,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(plan().effective_price_cents(), 134100);
        let mut free = plan();
        free.price_cents = 0;
        assert_eq!(free.effective_price_cents(), 0);
    }

    #[test]
    fn test_expires_at() {
        let start = Utc::now();
        assert_eq!(plan().expires_at(start) - start, Duration::days(30));
    }

    #[test]
    fn test_create_plan_validation() {
        let req = CreatePlanRequest {
            name: "Weekly".into(),
            code: "WEEKLY".into(),
            plan_type: PlanType::Basic,
            duration_days: 7,
            ticket_amount: 10,
            price_cents: 9900,
            discount_percent: 0,
            features: empty_features(),
            max_prompts_per_day: None,
            can_access_premium: false,
            can_download: false,
            can_use_api: false,
            sort_order: 0,
            is_popular: false,
        };
        assert!(req.validate().is_ok());

        let bad = CreatePlanRequest {
            duration_days: 0,
            ..req.clone()
        };
        assert!(bad.validate().is_err());

        let bad = CreatePlanRequest {
            price_cents: -5,
            ..req.clone()
        };
        assert!(bad.validate().is_err());

        let bad = CreatePlanRequest {
            discount_percent: 101,
            ..req
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_subscription_is_current() {
        let now = Utc::now();
        let mut sub = UserSubscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            plan_code: "PRO_MONTH".into(),
            can_access_premium: true,
            ticket_balance: 3,
            status: SubscriptionStatus::Active,
            started_at: now - Duration::days(1),
            expires_at: now + Duration::days(29),
        };
        assert!(sub.is_current(now));

        sub.expires_at = now - Duration::seconds(1);
        assert!(!sub.is_current(now));

        sub.expires_at = now + Duration::days(1);
        sub.status = SubscriptionStatus::Cancelled;
        assert!(!sub.is_current(now));
    }

    #[test]
    fn test_plan_type_parse() {
        assert_eq!("PRO".parse::<PlanType>().unwrap(), PlanType::Pro);
        assert!("gold".parse::<PlanType>().is_err());
    }

    #[test]
    fn test_charges_tickets_only_for_subscription_grants() {
        let decision = AccessDecision {
            granted: true,
            reason: AccessReason::Subscription,
            ticket_cost: 2,
            tickets_available: Some(5),
        };
        assert!(decision.charges_tickets());

        let free = AccessDecision {
            reason: AccessReason::Free,
            ..decision
        };
        assert!(!free.charges_tickets());

        let zero_cost = AccessDecision {
            ticket_cost: 0,
            ..decision
        };
        assert!(!zero_cost.charges_tickets());
    }
}

//! Dashboard statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prompt counts by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptStatusBreakdown {
    pub draft: i64,
    pub pending: i64,
    pub published: i64,
    pub archived: i64,
}

impl PromptStatusBreakdown {
    pub fn total(&self) -> i64 {
        self.draft + self.pending + self.published + self.archived
    }
}

/// Sales over a creator's prompts (or the whole catalog for admins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesMetrics {
    pub total_sales: i64,
    pub earnings_cents: i64,
    pub tickets_redeemed: i64,
}

/// Aggregated engagement counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub views: i64,
    pub likes: i64,
    pub saves: i64,
    pub comments: i64,
    pub ratings: i64,
}

/// Seller dashboard statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_prompts: i64,
    pub published_prompts: i64,
    pub by_status: PromptStatusBreakdown,
    pub sales: SalesMetrics,
    pub engagement: EngagementMetrics,
    pub generated_at: DateTime<Utc>,
}

impl DashboardStats {
    pub fn new(
        by_status: PromptStatusBreakdown,
        sales: SalesMetrics,
        engagement: EngagementMetrics,
    ) -> Self {
        Self {
            total_prompts: by_status.total(),
            published_prompts: by_status.published,
            by_status,
            sales,
            engagement,
            generated_at: Utc::now(),
        }
    }
}

/// Platform-wide statistics for administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(flatten)]
    pub catalog: DashboardStats,
    pub total_users: i64,
    pub active_subscriptions: i64,
    pub total_tags: i64,
    pub total_categories: i64,
}

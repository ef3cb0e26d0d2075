//! Dashboard statistics repository.

use domain::models::dashboard::{
    AdminStats, DashboardStats, EngagementMetrics, PromptStatusBreakdown, SalesMetrics,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::metrics::QueryTimer;

/// Repository for seller and admin dashboard statistics.
#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Statistics over the prompts created by `creator`, or the whole catalog when `None`.
    pub async fn catalog_stats(&self, creator: Option<Uuid>) -> Result<DashboardStats, sqlx::Error> {
        let timer = QueryTimer::new("dashboard_catalog_stats");
        let (by_status, sales, engagement) = tokio::try_join!(
            self.status_breakdown(creator),
            self.sales_metrics(creator),
            self.engagement_metrics(creator),
        )?;
        timer.record();
        Ok(DashboardStats::new(by_status, sales, engagement))
    }

    /// Catalog statistics plus site-wide counts.
    pub async fn admin_stats(&self) -> Result<AdminStats, sqlx::Error> {
        let timer = QueryTimer::new("dashboard_admin_stats");
        let (catalog, row) = tokio::try_join!(
            self.catalog_stats(None),
            sqlx::query(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users) AS total_users,
                    (SELECT COUNT(*) FROM user_subscriptions
                        WHERE status = 'active' AND expires_at > NOW()) AS active_subscriptions,
                    (SELECT COUNT(*) FROM tags) AS total_tags,
                    (SELECT COUNT(*) FROM categories) AS total_categories
                "#,
            )
            .fetch_one(&self.pool),
        )?;
        timer.record();

        Ok(AdminStats {
            catalog,
            total_users: row.get::<i64, _>("total_users"),
            active_subscriptions: row.get::<i64, _>("active_subscriptions"),
            total_tags: row.get::<i64, _>("total_tags"),
            total_categories: row.get::<i64, _>("total_categories"),
        })
    }

    async fn status_breakdown(
        &self,
        creator: Option<Uuid>,
    ) -> Result<PromptStatusBreakdown, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'draft') AS draft,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'published') AS published,
                COUNT(*) FILTER (WHERE status = 'archived') AS archived
            FROM prompts
            WHERE ($1::UUID IS NULL OR created_by = $1)
            "#,
        )
        .bind(creator)
        .fetch_one(&self.pool)
        .await?;

        Ok(PromptStatusBreakdown {
            draft: row.get::<i64, _>("draft"),
            pending: row.get::<i64, _>("pending"),
            published: row.get::<i64, _>("published"),
            archived: row.get::<i64, _>("archived"),
        })
    }

    async fn sales_metrics(&self, creator: Option<Uuid>) -> Result<SalesMetrics, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_sales,
                COALESCE(SUM(pu.price_paid_cents), 0)::BIGINT AS earnings_cents,
                COALESCE(SUM(pu.tickets_spent), 0)::BIGINT AS tickets_redeemed
            FROM purchases pu
            JOIN prompts p ON p.id = pu.prompt_id
            WHERE ($1::UUID IS NULL OR p.created_by = $1)
            "#,
        )
        .bind(creator)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesMetrics {
            total_sales: row.get::<i64, _>("total_sales"),
            earnings_cents: row.get::<i64, _>("earnings_cents"),
            tickets_redeemed: row.get::<i64, _>("tickets_redeemed"),
        })
    }

    async fn engagement_metrics(
        &self,
        creator: Option<Uuid>,
    ) -> Result<EngagementMetrics, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(view_count), 0)::BIGINT AS views,
                COALESCE(SUM(like_count), 0)::BIGINT AS likes,
                COALESCE(SUM(save_count), 0)::BIGINT AS saves,
                COALESCE(SUM(comment_count), 0)::BIGINT AS comments,
                COALESCE(SUM(rating_count), 0)::BIGINT AS ratings
            FROM prompts
            WHERE ($1::UUID IS NULL OR created_by = $1)
            "#,
        )
        .bind(creator)
        .fetch_one(&self.pool)
        .await?;

        Ok(EngagementMetrics {
            views: row.get::<i64, _>("views"),
            likes: row.get::<i64, _>("likes"),
            saves: row.get::<i64, _>("saves"),
            comments: row.get::<i64, _>("comments"),
            ratings: row.get::<i64, _>("ratings"),
        })
    }
}

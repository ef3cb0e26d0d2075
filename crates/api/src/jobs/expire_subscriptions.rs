//! Marks lapsed subscriptions as expired.
//!
//! Access checks already ignore subscriptions past `expires_at`; this keeps
//! the stored status in line for reporting.

use chrono::Utc;
use persistence::repositories::CommerceRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobError, JobFrequency};

pub struct ExpireSubscriptionsJob {
    commerce: CommerceRepository,
    interval_minutes: u64,
}

impl ExpireSubscriptionsJob {
    pub fn new(pool: PgPool, interval_minutes: u64) -> Self {
        Self {
            commerce: CommerceRepository::new(pool),
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for ExpireSubscriptionsJob {
    fn name(&self) -> &'static str {
        "expire_subscriptions"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), JobError> {
        let expired = self.commerce.expire_subscriptions(Utc::now()).await?;
        if expired > 0 {
            info!(expired, "Subscriptions expired");
        }
        metrics::gauge!("subscriptions_active")
            .set(self.commerce.count_active_subscriptions().await? as f64);
        Ok(())
    }
}

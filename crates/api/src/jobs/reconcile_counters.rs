//! Periodic recount of denormalized counters.

use persistence::repositories::ReconciliationRepository;
use sqlx::PgPool;
use tracing::{info, warn};

use super::scheduler::{Job, JobError, JobFrequency};

pub struct ReconcileCountersJob {
    repo: ReconciliationRepository,
    interval_minutes: u64,
}

impl ReconcileCountersJob {
    pub fn new(pool: PgPool, interval_minutes: u64) -> Self {
        Self {
            repo: ReconciliationRepository::new(pool),
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for ReconcileCountersJob {
    fn name(&self) -> &'static str {
        "reconcile_counters"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), JobError> {
        let report = self.repo.reconcile().await?;
        if report.is_clean() {
            info!("Counters consistent");
        } else {
            // Drift means some write path skipped its counter update.
            warn!(
                prompts_fixed = report.prompts_fixed,
                tags_fixed = report.tags_fixed,
                "Counter drift corrected"
            );
        }
        Ok(())
    }
}

//! Drops idle rate limiter keys so the keyed store stays bounded.

use std::sync::Arc;

use tracing::debug;

use super::scheduler::{Job, JobError, JobFrequency};
use crate::middleware::RateLimiterState;

pub struct PruneRateLimitsJob {
    limiter: Arc<RateLimiterState>,
}

impl PruneRateLimitsJob {
    pub fn new(limiter: Arc<RateLimiterState>) -> Self {
        Self { limiter }
    }
}

#[async_trait::async_trait]
impl Job for PruneRateLimitsJob {
    fn name(&self) -> &'static str {
        "prune_rate_limits"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(1)
    }

    async fn execute(&self) -> Result<(), JobError> {
        let remaining = self.limiter.prune();
        debug!(remaining, "Rate limiter keys pruned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::rate_limit::ClientKey;

    #[tokio::test]
    async fn test_prune_job_runs_against_shared_limiter() {
        let limiter = Arc::new(RateLimiterState::new(1, vec![]));
        limiter
            .check(&ClientKey::Ip("10.0.0.9".parse().unwrap()))
            .unwrap();

        let job = PruneRateLimitsJob::new(limiter.clone());
        assert_eq!(job.name(), "prune_rate_limits");
        job.execute().await.unwrap();
        assert_eq!(limiter.tracked_clients(), 1);
    }
}

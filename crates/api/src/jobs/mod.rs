//! Background job scheduler and job implementations.

mod expire_subscriptions;
mod pool_metrics;
mod prune_rate_limits;
mod reconcile_counters;
mod scheduler;

pub use expire_subscriptions::ExpireSubscriptionsJob;
pub use pool_metrics::PoolMetricsJob;
pub use prune_rate_limits::PruneRateLimitsJob;
pub use reconcile_counters::ReconcileCountersJob;
pub use scheduler::{run_once, Job, JobError, JobFrequency, JobScheduler};

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::JobsConfig;
use crate::middleware::RateLimiterState;

/// Scheduler with every maintenance job registered, not yet started.
pub fn scheduler_for(
    config: &JobsConfig,
    pool: &PgPool,
    rate_limiter: Option<Arc<RateLimiterState>>,
) -> JobScheduler {
    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.register(ReconcileCountersJob::new(
        pool.clone(),
        config.reconcile_interval_minutes,
    ));
    scheduler.register(ExpireSubscriptionsJob::new(
        pool.clone(),
        config.expire_subscriptions_interval_minutes,
    ));
    if let Some(limiter) = rate_limiter {
        scheduler.register(PruneRateLimitsJob::new(limiter));
    }
    scheduler
}

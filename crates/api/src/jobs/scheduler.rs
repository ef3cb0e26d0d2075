//! Interval scheduler for background maintenance jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Seconds(u64),
    Minutes(u64),
}

impl JobFrequency {
    pub fn duration(&self) -> Duration {
        match self {
            JobFrequency::Seconds(secs) => Duration::from_secs((*secs).max(1)),
            JobFrequency::Minutes(mins) => Duration::from_secs((*mins).max(1) * 60),
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Failed(String),
}

#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    async fn execute(&self) -> Result<(), JobError>;
}

fn record_job_run(name: &'static str, ok: bool, elapsed: Duration) {
    let outcome = if ok { "success" } else { "failure" };
    metrics::counter!("job_runs_total", "job" => name, "outcome" => outcome).increment(1);
    metrics::histogram!("job_duration_seconds", "job" => name).record(elapsed.as_secs_f64());
}

/// Runs one execution with logging and metrics. Returns whether it succeeded.
pub async fn run_once(job: &dyn Job) -> bool {
    let name = job.name();
    let start = Instant::now();
    let result = job.execute().await;
    let elapsed = start.elapsed();
    record_job_run(name, result.is_ok(), elapsed);

    match result {
        Ok(()) => {
            info!(job = name, elapsed_ms = elapsed.as_millis() as u64, "Job completed");
            true
        }
        Err(e) => {
            error!(
                job = name,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Job failed"
            );
            false
        }
    }
}

/// Owns the job tasks. `shutdown` signals them through a watch channel.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawns one task per job. The first run happens one interval after start.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");

        for job in &self.jobs {
            let job = Arc::clone(job);
            let mut shutdown_rx = self.shutdown_rx.clone();

            let handle = tokio::spawn(async move {
                let frequency = job.frequency();
                let mut interval = tokio::time::interval(frequency.duration());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                interval.tick().await;

                info!(job = job.name(), frequency = ?frequency, "Job scheduled");

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            run_once(job.as_ref()).await;
                        }
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                info!(job = job.name(), "Job shutting down");
                                break;
                            }
                        }
                    }
                }
            });

            self.handles.push(handle);
        }
    }

    /// Signals every job to stop. Returns immediately.
    pub fn shutdown(&self) {
        info!("Stopping job scheduler");
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for job tasks to exit, giving up after `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Job task panicked");
                }
            }
        };

        match tokio::time::timeout(timeout, all).await {
            Ok(()) => info!("All jobs stopped"),
            Err(_) => warn!(timeout = ?timeout, "Job shutdown timed out"),
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting_job"
        }

        fn frequency(&self) -> JobFrequency {
            JobFrequency::Seconds(1)
        }

        async fn execute(&self) -> Result<(), JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(JobError::Failed("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn job(fail: bool) -> (CountingJob, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (
            CountingJob {
                runs: Arc::clone(&runs),
                fail,
            },
            runs,
        )
    }

    #[test]
    fn test_job_frequency_duration() {
        assert_eq!(JobFrequency::Seconds(30).duration(), Duration::from_secs(30));
        assert_eq!(JobFrequency::Minutes(15).duration(), Duration::from_secs(900));
        assert_eq!(JobFrequency::Minutes(0).duration(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_run_once_reports_outcome() {
        let (ok_job, ok_runs) = job(false);
        let (bad_job, bad_runs) = job(true);

        assert!(run_once(&ok_job).await);
        assert!(!run_once(&bad_job).await);
        assert_eq!(ok_runs.load(Ordering::SeqCst), 1);
        assert_eq!(bad_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scheduler_register() {
        let mut scheduler = JobScheduler::default();
        assert_eq!(scheduler.job_count(), 0);
        scheduler.register(job(false).0);
        assert_eq!(scheduler.job_count(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_shutdown_before_first_run() {
        let mut scheduler = JobScheduler::new();
        let (counting, runs) = job(false);
        scheduler.register(counting);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}

//! Job executor: accepts submissions, runs workers in the background and
//! answers progress queries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use pizzapi_core::{Catalog, DomainError};

use super::store::{JobStateStore, JobStoreError};
use super::types::{JobId, JobSnapshot};
use super::worker::JobWorker;
use crate::source::MeasurementSource;

/// Job executor configuration.
#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// Maximum number of jobs running at once; the rest wait in PENDING
    pub max_concurrent: usize,
    /// Pause after each item
    pub pacing_delay: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            pacing_delay: Duration::from_millis(500),
            name: "job-executor".to_string(),
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_submitted: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub current_running: usize,
    pub uptime_secs: u64,
}

/// Receipt for an accepted job.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Submission {
    pub job_id: JobId,
    pub state: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidCount(#[from] DomainError),
    #[error("executor is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Never issued, or expired after its retention window.
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Background job executor.
///
/// Each accepted submission gets exactly one worker task. `submit` returns as
/// soon as the PENDING snapshot is stored; it never waits on the worker.
pub struct JobExecutor {
    store: Arc<dyn JobStateStore>,
    worker: JobWorker,
    catalog: Catalog,
    config: JobExecutorConfig,
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
    accepting: AtomicBool,
    started: Instant,
}

impl JobExecutor {
    pub fn new(
        store: Arc<dyn JobStateStore>,
        source: Arc<dyn MeasurementSource>,
        catalog: Catalog,
        config: JobExecutorConfig,
    ) -> Self {
        let worker = JobWorker::new(store.clone(), source).with_pacing_delay(config.pacing_delay);
        Self {
            store,
            worker,
            catalog,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            tasks: Mutex::new(JoinSet::new()),
            stats: Arc::new(Mutex::new(ExecutorStats::default())),
            accepting: AtomicBool::new(true),
            started: Instant::now(),
        }
    }

    /// Accept a job over the first `n` catalog objects.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, n: usize) -> Result<Submission, SubmitError> {
        let objects = self.catalog.select(n)?.to_vec();

        // Held until the task is spawned so `drain` cannot swap the set out
        // between the acceptance check and the spawn.
        let mut tasks = lock(&self.tasks);
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(SubmitError::ShuttingDown);
        }

        let job_id = JobId::new();
        self.store.put(job_id, JobSnapshot::pending())?;

        lock(&self.stats).jobs_submitted += 1;

        let worker = self.worker.clone();
        let store = self.store.clone();
        let permits = self.permits.clone();
        let stats = self.stats.clone();
        let executor = self.config.name.clone();

        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            // The semaphore is never closed, so this always yields a permit.
            let _permit = permits.acquire_owned().await.ok();

            lock(&stats).current_running += 1;
            debug!(executor = %executor, job_id = %job_id, "worker started");

            // Run the worker as its own task so that a panic inside it is
            // observed here instead of silently dropping the job.
            let outcome = tokio::spawn(async move { worker.run(job_id, &objects).await }).await;

            {
                let mut s = lock(&stats);
                s.current_running = s.current_running.saturating_sub(1);
            }

            match outcome {
                Ok(Ok(_)) => lock(&stats).jobs_succeeded += 1,
                Ok(Err(e)) => record_failure(&*store, &stats, job_id, e.to_string()),
                Err(join_err) => record_failure(&*store, &stats, job_id, format!("worker aborted: {join_err}")),
            }
        });

        info!(executor = %self.config.name, job_id = %job_id, n, "job submitted");
        Ok(Submission {
            job_id,
            state: "PENDING",
        })
    }

    /// Current snapshot of a job, verbatim from the store.
    pub fn query(&self, job_id: JobId) -> Result<JobSnapshot, QueryError> {
        self.store.get(job_id)?.ok_or(QueryError::NotFound(job_id))
    }

    /// Evict expired results from the store.
    pub fn purge_expired(&self) -> Result<usize, JobStoreError> {
        let purged = self.store.purge_expired()?;
        if purged > 0 {
            debug!(executor = %self.config.name, purged, "purged expired jobs");
        }
        Ok(purged)
    }

    pub fn stats(&self) -> ExecutorStats {
        let mut stats = lock(&self.stats).clone();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }

    /// Refuse further submissions. Jobs already accepted keep running.
    pub fn close(&self) {
        let _tasks = lock(&self.tasks);
        if self.accepting.swap(false, Ordering::SeqCst) {
            info!(executor = %self.config.name, "job executor closed to new submissions");
        }
    }

    /// Stop accepting new jobs and wait for every in-flight job to finish.
    pub async fn drain(&self) {
        let mut tasks = {
            let mut guard = lock(&self.tasks);
            if self.accepting.swap(false, Ordering::SeqCst) {
                info!(executor = %self.config.name, "job executor closed to new submissions");
            }
            std::mem::take(&mut *guard)
        };
        info!(executor = %self.config.name, in_flight = tasks.len(), "draining job executor");

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(executor = %self.config.name, error = %e, "job task ended abnormally");
            }
        }

        info!(executor = %self.config.name, "job executor drained");
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record_failure(store: &dyn JobStateStore, stats: &Mutex<ExecutorStats>, job_id: JobId, error: String) {
    error!(job_id = %job_id, error = %error, "job failed");
    lock(stats).jobs_failed += 1;
    if let Err(e) = store.put(job_id, JobSnapshot::failure(error)) {
        error!(job_id = %job_id, error = %e, "could not record job failure");
    }
}

//! Job state storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::{JobId, JobSnapshot, TransitionError};

/// Default time a finished job stays readable.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Job state store abstraction.
///
/// One writer per job (its worker), any number of readers. `put` replaces the
/// whole snapshot at once.
pub trait JobStateStore: Send + Sync {
    /// Replace the snapshot of a job, creating the entry if needed.
    ///
    /// Rejects writes after a terminal state and writes that move progress
    /// backwards.
    fn put(&self, job_id: JobId, snapshot: JobSnapshot) -> Result<(), JobStoreError>;

    /// Current snapshot, or `None` for unknown and expired jobs alike.
    fn get(&self, job_id: JobId) -> Result<Option<JobSnapshot>, JobStoreError>;

    /// Evict entries whose retention window has elapsed. Returns how many
    /// were removed.
    fn purge_expired(&self) -> Result<usize, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("rejected update for job {job_id}: {source}")]
    Transition {
        job_id: JobId,
        #[source]
        source: TransitionError,
    },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Retention deadline for a snapshot written at `now`.
///
/// Only terminal snapshots expire; `None` also covers a retention too large
/// to represent.
pub(crate) fn expiry_for(snapshot: &JobSnapshot, retention: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !snapshot.is_terminal() {
        return None;
    }
    let ttl = chrono::Duration::from_std(retention).ok()?;
    now.checked_add_signed(ttl)
}

#[derive(Debug, Clone)]
struct StoredSnapshot {
    snapshot: JobSnapshot,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredSnapshot {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory job state store for tests/dev and single-process deployments.
#[derive(Debug)]
pub struct InMemoryJobStateStore {
    entries: RwLock<HashMap<JobId, StoredSnapshot>>,
    retention: Duration,
}

impl InMemoryJobStateStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryJobStateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> JobStoreError {
    JobStoreError::Storage("job state lock poisoned".to_string())
}

impl JobStateStore for InMemoryJobStateStore {
    fn put(&self, job_id: JobId, snapshot: JobSnapshot) -> Result<(), JobStoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().map_err(poisoned)?;

        if let Some(current) = entries.get(&job_id) {
            if !current.is_expired(now) {
                snapshot
                    .may_follow(&current.snapshot)
                    .map_err(|source| JobStoreError::Transition { job_id, source })?;
            }
        }

        let expires_at = expiry_for(&snapshot, self.retention, now);
        entries.insert(
            job_id,
            StoredSnapshot {
                snapshot,
                expires_at,
            },
        );
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Result<Option<JobSnapshot>, JobStoreError> {
        let entries = self.entries.read().map_err(poisoned)?;
        let now = Utc::now();
        Ok(entries
            .get(&job_id)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.snapshot.clone()))
    }

    fn purge_expired(&self) -> Result<usize, JobStoreError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(before - entries.len())
    }
}

impl<T: JobStateStore + ?Sized> JobStateStore for Arc<T> {
    fn put(&self, job_id: JobId, snapshot: JobSnapshot) -> Result<(), JobStoreError> {
        (**self).put(job_id, snapshot)
    }

    fn get(&self, job_id: JobId) -> Result<Option<JobSnapshot>, JobStoreError> {
        (**self).get(job_id)
    }

    fn purge_expired(&self) -> Result<usize, JobStoreError> {
        (**self).purge_expired()
    }
}

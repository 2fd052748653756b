//! Redis-backed job state store (optional).
//!
//! Snapshots are stored as JSON strings under `<prefix><job_id>`. Terminal
//! snapshots are written with `SET .. EX` so Redis evicts them itself once
//! the retention window has elapsed; `purge_expired` has nothing to do.
//!
//! The read-validate-write in `put` is not atomic. That is fine while every
//! job has exactly one writer, which the executor guarantees.

use std::time::Duration;

use redis::Commands;

use super::store::{DEFAULT_RETENTION, JobStateStore, JobStoreError};
use super::types::{JobId, JobSnapshot};

pub const DEFAULT_KEY_PREFIX: &str = "pizzapi:job:";

#[derive(Debug, Clone)]
pub struct RedisJobStateStore {
    client: redis::Client,
    key_prefix: String,
    retention: Duration,
}

impl RedisJobStateStore {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, JobStoreError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(storage)?;
        Ok(Self {
            client,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            retention: DEFAULT_RETENTION,
        })
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, job_id: JobId) -> String {
        format!("{}{}", self.key_prefix, job_id)
    }

    fn connection(&self) -> Result<redis::Connection, JobStoreError> {
        self.client.get_connection().map_err(storage)
    }

    fn read(conn: &mut redis::Connection, key: &str) -> Result<Option<JobSnapshot>, JobStoreError> {
        let raw: Option<String> = conn.get(key).map_err(storage)?;
        raw.map(|json| serde_json::from_str(&json).map_err(|e| JobStoreError::Serialize(e.to_string())))
            .transpose()
    }
}

fn storage(err: redis::RedisError) -> JobStoreError {
    JobStoreError::Storage(err.to_string())
}

impl JobStateStore for RedisJobStateStore {
    fn put(&self, job_id: JobId, snapshot: JobSnapshot) -> Result<(), JobStoreError> {
        let key = self.key(job_id);
        let mut conn = self.connection()?;

        if let Some(prev) = Self::read(&mut conn, &key)? {
            snapshot
                .may_follow(&prev)
                .map_err(|source| JobStoreError::Transition { job_id, source })?;
        }

        let payload = serde_json::to_string(&snapshot).map_err(|e| JobStoreError::Serialize(e.to_string()))?;

        if !snapshot.is_terminal() {
            let _: () = conn.set(&key, payload).map_err(storage)?;
            return Ok(());
        }

        match self.retention.as_secs() {
            // EX 0 is rejected by Redis; a zero window means gone immediately.
            0 => {
                let _: () = conn.del(&key).map_err(storage)?;
            }
            secs => {
                let _: () = conn.set_ex(&key, payload, secs).map_err(storage)?;
            }
        }
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Result<Option<JobSnapshot>, JobStoreError> {
        let mut conn = self.connection()?;
        Self::read(&mut conn, &self.key(job_id))
    }

    fn purge_expired(&self) -> Result<usize, JobStoreError> {
        Ok(0)
    }
}

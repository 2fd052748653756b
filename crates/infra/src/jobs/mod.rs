//! Estimation jobs: state model, storage, the worker and the executor.
//!
//! ## Components
//!
//! - `JobSnapshot`: everything a client can observe about a job
//! - `JobStateStore`: shared snapshot storage (in-memory, or Redis with the
//!   `redis` feature)
//! - `JobWorker`: processes one job's objects in order
//! - `JobExecutor`: accepts submissions and runs workers in the background

pub mod executor;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;
pub mod types;
pub mod worker;

pub use executor::{ExecutorStats, JobExecutor, JobExecutorConfig, QueryError, SubmitError, Submission};
#[cfg(feature = "redis")]
pub use redis_store::RedisJobStateStore;
pub use store::{DEFAULT_RETENTION, InMemoryJobStateStore, JobStateStore, JobStoreError};
pub use types::{JobId, JobSnapshot, TransitionError};
pub use worker::{JobWorker, WorkerError};

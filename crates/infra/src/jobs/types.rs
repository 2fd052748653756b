//! Core job types: identifiers and the snapshot state machine.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pizzapi_core::{DomainError, ItemResult, JobResult};

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("JobId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Point-in-time view of a job, as written by its worker and read by pollers.
///
/// Snapshots are replaced whole; a reader never sees half of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSnapshot {
    /// Accepted, no worker has picked it up yet.
    Pending { progress: f64 },
    /// A worker is iterating over the objects.
    Progress {
        progress: f64,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_item: Option<String>,
        objects_processed: usize,
        items_result: Vec<ItemResult>,
    },
    /// Every object was attempted. The payload may still be `AllFailed`.
    Success { progress: f64, result: JobResult },
    /// The worker itself broke down.
    Failure { error: String },
}

/// Why a snapshot may not replace the current one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("job already reached a terminal state")]
    AlreadyTerminal,
    #[error("progress may not go backwards ({from} -> {to})")]
    ProgressRegression { from: f64, to: f64 },
}

impl JobSnapshot {
    pub fn pending() -> Self {
        Self::Pending { progress: 0.0 }
    }

    pub fn success(result: JobResult) -> Self {
        Self::Success {
            progress: 1.0,
            result,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Wire name of the state.
    pub fn state(&self) -> &'static str {
        match self {
            JobSnapshot::Pending { .. } => "PENDING",
            JobSnapshot::Progress { .. } => "PROGRESS",
            JobSnapshot::Success { .. } => "SUCCESS",
            JobSnapshot::Failure { .. } => "FAILURE",
        }
    }

    /// Progress fraction, absent for a failed job.
    pub fn progress(&self) -> Option<f64> {
        match self {
            JobSnapshot::Pending { progress }
            | JobSnapshot::Progress { progress, .. }
            | JobSnapshot::Success { progress, .. } => Some(*progress),
            JobSnapshot::Failure { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobSnapshot::Success { .. } | JobSnapshot::Failure { .. })
    }

    /// Check that `self` may replace `previous`.
    ///
    /// Terminal snapshots are final and progress never decreases. A failure
    /// may interrupt any non-terminal state.
    pub fn may_follow(&self, previous: &JobSnapshot) -> Result<(), TransitionError> {
        if previous.is_terminal() {
            return Err(TransitionError::AlreadyTerminal);
        }
        if let (Some(from), Some(to)) = (previous.progress(), self.progress()) {
            if to < from {
                return Err(TransitionError::ProgressRegression { from, to });
            }
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use pizzapi_infra::jobs::{JobId, JobSnapshot};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub n: usize,
}

// -------------------------
// Response DTOs
// -------------------------

/// A job snapshot with its id, e.g.
/// `{"job_id": "...", "state": "PROGRESS", "progress": 0.25, ...}`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    #[serde(flatten)]
    pub snapshot: JobSnapshot,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

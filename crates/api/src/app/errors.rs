use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pizzapi_infra::jobs::{JobId, QueryError, SubmitError};

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::InvalidCount(e) => json_error(StatusCode::BAD_REQUEST, "invalid_count", e.to_string()),
        SubmitError::ShuttingDown => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "shutting_down",
            "server is shutting down and not accepting new jobs",
        ),
        SubmitError::Store(e) => {
            tracing::error!(error = %e, "failed to record new job");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn query_error_to_response(err: QueryError) -> axum::response::Response {
    match err {
        QueryError::NotFound(job_id) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("job {job_id} not found or expired"),
        ),
        QueryError::Store(e) => {
            tracing::error!(error = %e, "failed to read job state");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

/// A job whose worker faulted is reported as a server error, with the job id
/// so the client can correlate it.
pub fn job_failed(job_id: JobId, message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({
            "error": "job_failed",
            "message": message.into(),
            "job_id": job_id,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

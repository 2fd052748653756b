//! Job submission and status endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use pizzapi_infra::jobs::{JobId, JobSnapshot};

use crate::app::{dto, errors, services::AppServices};

/// POST /jobs
///
/// Returns 202 as soon as the job is recorded as PENDING.
pub async fn submit_job(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SubmitJobRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text());
        }
    };

    match services.executor.submit(body.n) {
        Ok(submission) => (StatusCode::ACCEPTED, Json(submission)).into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}

/// GET /jobs/:job_id
pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id: JobId = match job_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_job_id", format!("{e}")),
    };

    match services.executor.query(job_id) {
        Ok(JobSnapshot::Failure { error }) => errors::job_failed(job_id, error),
        Ok(snapshot) => Json(dto::JobStatusResponse { job_id, snapshot }).into_response(),
        Err(e) => errors::query_error_to_response(e),
    }
}

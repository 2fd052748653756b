use axum::{
    routing::{get, post},
    Router,
};

pub mod jobs;
pub mod system;

/// Router for all endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/stats", get(system::stats))
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/:job_id", get(jobs::get_job))
}

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};

use pizzapi_infra::jobs::ExecutorStats;

use crate::app::dto::MessageResponse;
use crate::app::services::AppServices;

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello Pizza Pi!",
    })
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> Json<ExecutorStats> {
    Json(services.executor.stats())
}

use axum::extract::State;
use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Checks the database pool can still serve a query and the
/// ingestion queue has not wedged full; either failure degrades
/// readiness without taking the process down.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if sqlx::query("SELECT 1").execute(state.db_pool.get_pool()).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if state.ingestion.is_queue_full() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

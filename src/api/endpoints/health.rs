//! Liveness and store health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

pub const LIVENESS_MESSAGE: &str = "Healthcare Appointment API is running";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// `GET /`: plain-text liveness string.
pub async fn root() -> &'static str {
    LIVENESS_MESSAGE
}

/// `GET /health`: 200 when the store answers, 503 otherwise.
pub async fn check(State(ctx): State<ApiContext>) -> (StatusCode, Json<HealthResponse>) {
    if ctx.core.store_connected() {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "connected",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "error",
                database: "disconnected",
            }),
        )
    }
}

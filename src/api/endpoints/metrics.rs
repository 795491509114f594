//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::api::types::ApiContext;
use crate::telemetry::PROMETHEUS_CONTENT_TYPE;

/// `GET /metrics`
pub async fn scrape(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let body = ctx.metrics.render(ctx.core.uptime());
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}

//! Request metrics middleware.
//!
//! Times each request end to end and records it in the shared
//! `HttpMetrics` registry. Reads `ApiContext` from request extensions,
//! so the `Extension` layer must sit outside this one.
//!
//! Series are labelled by the matched route template, never the raw path,
//! so the label set is bounded by the route table.

use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiContext;
use crate::telemetry::UNMATCHED_ROUTE;

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

pub async fn record(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = method_label(req.method());
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let ctx = req.extensions().get::<ApiContext>().cloned();

    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed = started.elapsed();

    let status = response.status().as_u16();
    tracing::debug!(method, %route, status, elapsed_ms = elapsed.as_millis() as u64, "request");

    if let Some(ctx) = ctx {
        ctx.metrics.observe(method, &route, status, elapsed);
    }

    response
}

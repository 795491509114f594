//! Shared types for the HTTP API layer.

use std::sync::Arc;

use crate::core_state::CoreState;
use crate::telemetry::HttpMetrics;

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the request metrics registry.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub metrics: Arc<HttpMetrics>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            metrics: Arc::new(HttpMetrics::new()),
        }
    }
}

/// Caller identity recorded alongside GDPR audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

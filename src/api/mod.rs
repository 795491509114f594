//! HTTP API.
//!
//! Exposes the appointment store and the GDPR routes as JSON endpoints.
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::{api_router, build_router};
pub use server::{shutdown_signal, start_api_server_on, ApiServer};
pub use types::ApiContext;

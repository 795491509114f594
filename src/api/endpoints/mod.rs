//! API endpoint handlers, one module per resource.

pub mod appointments;
pub mod gdpr;
pub mod health;
pub mod metrics;

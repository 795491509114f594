//! API middleware.
//!
//! Only one layer sits in front of the handlers: the metrics recorder,
//! which times every request and records it by method, route and status.

pub mod metrics;

//! HTTP middleware for request processing.
//!
//! Provides not-found interception and observability middleware.

pub mod redirect;
pub mod tracing;

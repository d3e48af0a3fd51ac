//! HTTP layer hosting the redirect resolver.
//!
//! # Modules
//!
//! - [`dto`] - Data Transfer Objects for response serialization
//! - [`handlers`] - Health check and not-found fallback
//! - [`middleware`] - Redirect interception and request tracing
//! - [`routes`] - Route configuration and composition

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

//! Application layer services.
//!
//! Services orchestrate domain operations on top of the repository traits
//! and give the HTTP layer and the admin CLI a small API to call.
//!
//! # Available Services
//!
//! - [`services::redirect_service::RedirectService`] - Per-request redirect decision and logging
//! - [`services::mapping_service::MappingService`] - Mapping snapshot loading and refresh
//! - [`services::log_service::LogService`] - Unhandled URL review

pub mod services;

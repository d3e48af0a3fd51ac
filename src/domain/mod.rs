//! Domain layer: entities, repository contracts and the pure resolution
//! logic that does not depend on the HTTP host or the database.
//!
//! # Architecture
//!
//! - [`entities`] - Mapping rules and redirect log records
//! - [`repositories`] - Data access trait definitions
//! - [`rule_set`] - Compiled mapping snapshot and the rule matcher
//! - [`request_context`] - Per-request idempotency flags
//! - [`diagnostics`] - Operator-only diagnostics sink
//! - [`log_event`] - Redirect log event model
//! - [`log_worker`] - Asynchronous log persistence worker
//!
//! # Log Flow
//!
//! 1. [`crate::application::services::RedirectService`] claims the request's log slot
//! 2. A [`log_event::RedirectLogEvent`] is sent to a bounded channel
//! 3. [`log_worker::run_log_worker`] persists it with retry
//! 4. The record lands in [`repositories::RedirectLogRepository`]

pub mod diagnostics;
pub mod entities;
pub mod log_event;
pub mod log_worker;
pub mod repositories;
pub mod request_context;
pub mod rule_set;

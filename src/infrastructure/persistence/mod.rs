//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgMappingRepository`] - Mapping rules
//! - [`PgRedirectLogRepository`] - Redirect log and operator review queries

pub mod pg_mapping_repository;
pub mod pg_redirect_log_repository;

pub use pg_mapping_repository::PgMappingRepository;
pub use pg_redirect_log_repository::PgRedirectLogRepository;

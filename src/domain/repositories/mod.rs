//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data operations; implementations live in
//! `crate::infrastructure`. Mock implementations are generated via `mockall`
//! for unit tests.
//!
//! # Available Repositories
//!
//! - [`MappingRepository`] - Exact and pattern mapping rules
//! - [`RedirectLogRepository`] - Redirect log append and operator review

pub mod mapping_repository;
pub mod redirect_log_repository;

pub use mapping_repository::MappingRepository;
pub use redirect_log_repository::RedirectLogRepository;

#[cfg(test)]
pub use mapping_repository::MockMappingRepository;
#[cfg(test)]
pub use redirect_log_repository::MockRedirectLogRepository;

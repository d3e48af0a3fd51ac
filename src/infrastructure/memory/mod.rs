//! In-process repository implementations.
//!
//! Used by the integration tests. Nothing is persisted across restarts.

mod mapping_repository;
mod redirect_log_repository;

pub use mapping_repository::InMemoryMappingRepository;
pub use redirect_log_repository::InMemoryRedirectLogRepository;

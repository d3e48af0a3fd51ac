//! Business logic services for the application layer.

pub mod log_service;
pub mod mapping_service;
pub mod redirect_service;

pub use log_service::LogService;
pub use mapping_service::MappingService;
pub use redirect_service::{RedirectMode, RedirectOutcome, RedirectService};

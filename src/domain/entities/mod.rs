//! Core domain entities.
//!
//! - [`MappingRule`] - A configured source → target mapping
//! - [`RedirectLogEntry`] - One logged incoming URL
//! - [`UnhandledUrl`] - Aggregated read model for operator review
//!
//! Creation inputs follow the same "New Type" split as the rest of the
//! crate: `NewMappingRule`, `NewRedirectLogEntry`.

pub mod mapping_rule;
pub mod redirect_log;

pub use mapping_rule::{MappingRule, NewMappingRule, RuleKind};
pub use redirect_log::{NewRedirectLogEntry, RedirectLogEntry, UnhandledUrl};

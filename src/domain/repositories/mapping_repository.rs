//! Repository trait for the redirect mapping table.

use crate::domain::entities::{MappingRule, NewMappingRule, RuleKind};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for mapping rules.
///
/// The redirect path only reads; `create` and `delete` exist for the
/// operator CLI.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMappingRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::InMemoryMappingRepository`] - In-process store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Lists the rules of one kind for a portal.
    ///
    /// Pattern rules come back in evaluation order (`sort_order`, then `id`).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list_rules(&self, portal_id: i32, kind: RuleKind)
    -> Result<Vec<MappingRule>, AppError>;

    /// Creates a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if an exact rule with the same
    /// lowercased source already exists for the portal.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_rule: NewMappingRule) -> Result<MappingRule, AppError>;

    /// Deletes a rule by id.
    ///
    /// Returns `Ok(true)` if a rule was removed, `Ok(false)` if none matched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

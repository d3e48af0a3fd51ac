//! Repository trait for the redirect log.

use crate::domain::entities::{NewRedirectLogEntry, RedirectLogEntry, UnhandledUrl};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for the append-only redirect log.
///
/// The redirect path only appends. The remaining operations back the
/// operator review workflow.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgRedirectLogRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::InMemoryRedirectLogRepository`] - In-process store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectLogRepository: Send + Sync {
    /// Appends a log record.
    ///
    /// Callers enforce the at-most-once-per-request guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn append(&self, entry: NewRedirectLogEntry) -> Result<RedirectLogEntry, AppError>;

    /// Returns the most frequent unhandled URLs logged since `since`.
    ///
    /// Only records without a mapping and without `handled_on` count.
    /// Ordered by occurrences, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn top_unhandled_urls(
        &self,
        portal_id: i32,
        since: DateTime<Utc>,
        max_count: i64,
    ) -> Result<Vec<UnhandledUrl>, AppError>;

    /// Marks every unhandled record of `url` as handled.
    ///
    /// Returns the number of records updated.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn mark_handled(
        &self,
        url: &str,
        handled_at: DateTime<Utc>,
        handled_by: &str,
    ) -> Result<u64, AppError>;
}

//! Redirect log entity: one record per handled (or unhandled) incoming URL.

use chrono::{DateTime, Utc};

/// A persisted redirect log record.
///
/// Append-only from the redirect path; only the operator fields
/// (`handled_on`, `handled_by`) are ever written afterwards.
#[derive(Debug, Clone)]
pub struct RedirectLogEntry {
    pub id: i64,
    pub portal_id: i32,
    pub incoming_url: String,
    pub logged_at: DateTime<Utc>,
    pub referrer: String,
    pub user_agent: String,
    pub target: String,
    pub mapping_found: bool,
    pub handled_on: Option<DateTime<Utc>>,
    pub handled_by: Option<String>,
}

/// Input data for appending a log record.
///
/// `referrer`, `user_agent` and `target` are empty strings when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRedirectLogEntry {
    pub portal_id: i32,
    pub incoming_url: String,
    pub logged_at: DateTime<Utc>,
    pub referrer: String,
    pub user_agent: String,
    pub target: String,
    pub mapping_found: bool,
}

impl NewRedirectLogEntry {
    /// Builds the persisted form once the store has assigned an id.
    pub fn into_entry(self, id: i64) -> RedirectLogEntry {
        RedirectLogEntry {
            id,
            portal_id: self.portal_id,
            incoming_url: self.incoming_url,
            logged_at: self.logged_at,
            referrer: self.referrer,
            user_agent: self.user_agent,
            target: self.target,
            mapping_found: self.mapping_found,
            handled_on: None,
            handled_by: None,
        }
    }
}

/// An incoming URL that produced no mapping, with how often it was seen.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UnhandledUrl {
    pub url: String,
    pub occurrences: i64,
}

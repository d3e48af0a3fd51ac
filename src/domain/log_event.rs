//! Redirect log event passed from the request path to the log worker.

use chrono::{DateTime, Utc};

use crate::domain::entities::NewRedirectLogEntry;

/// An in-memory log record waiting to be persisted.
///
/// Created by the redirect decision once the request's log slot has been
/// claimed, then sent to [`crate::domain::log_worker::run_log_worker`] over a
/// bounded channel so the response never waits on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectLogEvent {
    pub portal_id: i32,
    pub incoming_url: String,
    pub logged_at: DateTime<Utc>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub target: String,
    pub mapping_found: bool,
}

impl RedirectLogEvent {
    /// Creates a new event stamped with the current UTC time.
    pub fn new(
        portal_id: i32,
        incoming_url: String,
        referrer: Option<&str>,
        user_agent: Option<&str>,
        target: String,
        mapping_found: bool,
    ) -> Self {
        Self {
            portal_id,
            incoming_url,
            logged_at: Utc::now(),
            referrer: referrer.map(|s| s.to_string()),
            user_agent: user_agent.map(|s| s.to_string()),
            target,
            mapping_found,
        }
    }

    /// Store input; absent headers become empty strings.
    pub fn into_new_entry(self) -> NewRedirectLogEntry {
        NewRedirectLogEntry {
            portal_id: self.portal_id,
            incoming_url: self.incoming_url,
            logged_at: self.logged_at,
            referrer: self.referrer.unwrap_or_default(),
            user_agent: self.user_agent.unwrap_or_default(),
            target: self.target,
            mapping_found: self.mapping_found,
        }
    }
}

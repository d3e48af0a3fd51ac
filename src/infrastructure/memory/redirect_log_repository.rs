//! In-process redirect log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::domain::entities::{NewRedirectLogEntry, RedirectLogEntry, UnhandledUrl};
use crate::domain::repositories::RedirectLogRepository;
use crate::error::AppError;

/// Redirect log backed by a `Vec`.
#[derive(Default)]
pub struct InMemoryRedirectLogRepository {
    entries: Mutex<Vec<RedirectLogEntry>>,
}

impl InMemoryRedirectLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record written so far, oldest first.
    pub fn entries(&self) -> Vec<RedirectLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RedirectLogRepository for InMemoryRedirectLogRepository {
    async fn append(&self, entry: NewRedirectLogEntry) -> Result<RedirectLogEntry, AppError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = entry.into_entry(entries.len() as i64 + 1);
        entries.push(saved.clone());

        Ok(saved)
    }

    async fn top_unhandled_urls(
        &self,
        portal_id: i32,
        since: DateTime<Utc>,
        max_count: i64,
    ) -> Result<Vec<UnhandledUrl>, AppError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let mut counts: HashMap<&str, i64> = HashMap::new();
        for entry in entries.iter().filter(|e| {
            e.portal_id == portal_id
                && e.logged_at >= since
                && !e.mapping_found
                && e.handled_on.is_none()
        }) {
            *counts.entry(entry.incoming_url.as_str()).or_default() += 1;
        }

        let mut urls: Vec<UnhandledUrl> = counts
            .into_iter()
            .map(|(url, occurrences)| UnhandledUrl {
                url: url.to_string(),
                occurrences,
            })
            .collect();
        urls.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then(a.url.cmp(&b.url)));
        urls.truncate(usize::try_from(max_count).unwrap_or(0));

        Ok(urls)
    }

    async fn mark_handled(
        &self,
        url: &str,
        handled_at: DateTime<Utc>,
        handled_by: &str,
    ) -> Result<u64, AppError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let mut updated = 0;
        for entry in entries
            .iter_mut()
            .filter(|e| e.incoming_url == url && e.handled_on.is_none())
        {
            entry.handled_on = Some(handled_at);
            entry.handled_by = Some(handled_by.to_string());
            updated += 1;
        }

        Ok(updated)
    }
}

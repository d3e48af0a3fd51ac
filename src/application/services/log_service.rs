//! Operator review of the redirect log.

use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use serde_json::json;

use crate::domain::entities::UnhandledUrl;
use crate::domain::repositories::RedirectLogRepository;
use crate::error::AppError;

/// Service behind the operator review workflow: find URLs that keep
/// failing to resolve, then mark them handled once a mapping exists.
pub struct LogService {
    repository: Arc<dyn RedirectLogRepository>,
}

impl LogService {
    /// Creates a new log service.
    pub fn new(repository: Arc<dyn RedirectLogRepository>) -> Self {
        Self { repository }
    }

    /// Top unhandled URLs logged during the last `max_days` days.
    ///
    /// The window starts at UTC midnight `max_days` days ago.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `max_urls` is not positive.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn top_unhandled_urls(
        &self,
        portal_id: i32,
        max_days: u64,
        max_urls: i64,
    ) -> Result<Vec<UnhandledUrl>, AppError> {
        if max_urls <= 0 {
            return Err(AppError::bad_request(
                "max_urls must be positive",
                json!({ "max_urls": max_urls }),
            ));
        }

        let since = window_start(Utc::now(), max_days)?;
        self.repository
            .top_unhandled_urls(portal_id, since, max_urls)
            .await
    }

    /// Marks all unhandled records of `url` as handled by `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no unhandled record matched.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn mark_handled(&self, url: &str, user: &str) -> Result<u64, AppError> {
        let updated = self
            .repository
            .mark_handled(&url.to_lowercase(), Utc::now(), user)
            .await?;

        if updated == 0 {
            return Err(AppError::not_found(
                "No unhandled log records for url",
                json!({ "url": url }),
            ));
        }

        Ok(updated)
    }
}

fn window_start(now: DateTime<Utc>, max_days: u64) -> Result<DateTime<Utc>, AppError> {
    now.date_naive()
        .checked_sub_days(Days::new(max_days))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc())
        .ok_or_else(|| AppError::bad_request("max_days out of range", json!({ "max_days": max_days })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockRedirectLogRepository;
    use chrono::TimeZone;

    #[test]
    fn test_window_start_is_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();

        let start = window_start(now, 7).unwrap();

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_top_unhandled_urls() {
        let mut mock_repo = MockRedirectLogRepository::new();
        mock_repo
            .expect_top_unhandled_urls()
            .withf(|portal_id, _, max| *portal_id == 2 && *max == 5)
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    UnhandledUrl {
                        url: "http://site/a".to_string(),
                        occurrences: 9,
                    },
                    UnhandledUrl {
                        url: "http://site/b".to_string(),
                        occurrences: 2,
                    },
                ])
            });

        let service = LogService::new(Arc::new(mock_repo));

        let urls = service.top_unhandled_urls(2, 30, 5).await.unwrap();

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].occurrences, 9);
    }

    #[tokio::test]
    async fn test_top_unhandled_urls_rejects_zero_limit() {
        let service = LogService::new(Arc::new(MockRedirectLogRepository::new()));

        let result = service.top_unhandled_urls(0, 30, 0).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_mark_handled_lowercases_url() {
        let mut mock_repo = MockRedirectLogRepository::new();
        mock_repo
            .expect_mark_handled()
            .withf(|url, _, user| url == "http://site/old" && user == "admin")
            .times(1)
            .returning(|_, _, _| Ok(3));

        let service = LogService::new(Arc::new(mock_repo));

        let updated = service.mark_handled("http://Site/OLD", "admin").await.unwrap();

        assert_eq!(updated, 3);
    }

    #[tokio::test]
    async fn test_mark_handled_nothing_to_update() {
        let mut mock_repo = MockRedirectLogRepository::new();
        mock_repo
            .expect_mark_handled()
            .returning(|_, _, _| Ok(0));

        let service = LogService::new(Arc::new(mock_repo));

        let result = service.mark_handled("http://site/none", "admin").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}

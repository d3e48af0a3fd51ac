//! PostgreSQL implementation of the redirect log repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewRedirectLogEntry, RedirectLogEntry, UnhandledUrl};
use crate::domain::repositories::RedirectLogRepository;
use crate::error::AppError;

/// PostgreSQL repository for the `redirect_log` table.
pub struct PgRedirectLogRepository {
    pool: Arc<PgPool>,
}

impl PgRedirectLogRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedirectLogRepository for PgRedirectLogRepository {
    async fn append(&self, entry: NewRedirectLogEntry) -> Result<RedirectLogEntry, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO redirect_log
                (portal_id, incoming_url, logged_at, referrer, user_agent, target, mapping_found)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.portal_id)
        .bind(&entry.incoming_url)
        .bind(entry.logged_at)
        .bind(&entry.referrer)
        .bind(&entry.user_agent)
        .bind(&entry.target)
        .bind(entry.mapping_found)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(entry.into_entry(id))
    }

    async fn top_unhandled_urls(
        &self,
        portal_id: i32,
        since: DateTime<Utc>,
        max_count: i64,
    ) -> Result<Vec<UnhandledUrl>, AppError> {
        let rows = sqlx::query_as::<_, UnhandledUrl>(
            r#"
            SELECT incoming_url AS url, COUNT(*) AS occurrences
            FROM redirect_log
            WHERE portal_id = $1
              AND logged_at >= $2
              AND NOT mapping_found
              AND handled_on IS NULL
            GROUP BY incoming_url
            ORDER BY occurrences DESC, url
            LIMIT $3
            "#,
        )
        .bind(portal_id)
        .bind(since)
        .bind(max_count)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn mark_handled(
        &self,
        url: &str,
        handled_at: DateTime<Utc>,
        handled_by: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE redirect_log
            SET handled_on = $2, handled_by = $3
            WHERE incoming_url = $1 AND handled_on IS NULL
            "#,
        )
        .bind(url)
        .bind(handled_at)
        .bind(handled_by)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}

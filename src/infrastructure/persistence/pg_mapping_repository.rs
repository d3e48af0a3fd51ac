//! PostgreSQL implementation of the mapping repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{MappingRule, NewMappingRule, RuleKind};
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct MappingRow {
    id: i64,
    portal_id: i32,
    source_url: String,
    target_url: String,
    use_regex: bool,
    enable_logging: bool,
    sort_order: i32,
}

impl From<MappingRow> for MappingRule {
    fn from(row: MappingRow) -> Self {
        MappingRule::new(
            row.id,
            row.portal_id,
            row.source_url,
            row.target_url,
            RuleKind::from_uses_pattern(row.use_regex),
            row.enable_logging,
            row.sort_order,
        )
    }
}

/// PostgreSQL repository for the `redirect_mappings` table.
pub struct PgMappingRepository {
    pool: Arc<PgPool>,
}

impl PgMappingRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn list_rules(
        &self,
        portal_id: i32,
        kind: RuleKind,
    ) -> Result<Vec<MappingRule>, AppError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT id, portal_id, source_url, target_url, use_regex, enable_logging, sort_order
            FROM redirect_mappings
            WHERE portal_id = $1 AND use_regex = $2
            ORDER BY sort_order, id
            "#,
        )
        .bind(portal_id)
        .bind(kind.uses_pattern())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(MappingRule::from).collect())
    }

    async fn create(&self, new_rule: NewMappingRule) -> Result<MappingRule, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            INSERT INTO redirect_mappings
                (portal_id, source_url, target_url, use_regex, enable_logging, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, portal_id, source_url, target_url, use_regex, enable_logging, sort_order
            "#,
        )
        .bind(new_rule.portal_id)
        .bind(&new_rule.source)
        .bind(&new_rule.target)
        .bind(new_rule.kind.uses_pattern())
        .bind(new_rule.logging_enabled)
        .bind(new_rule.sort_order)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM redirect_mappings WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

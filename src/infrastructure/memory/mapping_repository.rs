//! In-process mapping store.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{PoisonError, RwLock};

use crate::domain::entities::{MappingRule, NewMappingRule, RuleKind};
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

/// Mapping repository backed by a `Vec`.
///
/// Applies the same constraints as the database: exact sources are unique
/// per portal after lowercasing, and rules list in `(sort_order, id)` order.
#[derive(Default)]
pub struct InMemoryMappingRepository {
    rules: RwLock<Vec<MappingRule>>,
}

impl InMemoryMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingRepository for InMemoryMappingRepository {
    async fn list_rules(
        &self,
        portal_id: i32,
        kind: RuleKind,
    ) -> Result<Vec<MappingRule>, AppError> {
        let mut rules: Vec<MappingRule> = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.portal_id == portal_id && r.kind == kind)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (r.sort_order, r.id));

        Ok(rules)
    }

    async fn create(&self, new_rule: NewMappingRule) -> Result<MappingRule, AppError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);

        if new_rule.kind == RuleKind::Exact {
            let key = new_rule.source.to_lowercase();
            let duplicate = rules.iter().any(|r| {
                r.portal_id == new_rule.portal_id
                    && r.kind == RuleKind::Exact
                    && r.source.to_lowercase() == key
            });
            if duplicate {
                return Err(AppError::conflict(
                    "Unique constraint violation",
                    json!({ "constraint": "redirect_mappings_exact_source_key" }),
                ));
            }
        }

        let id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let rule = MappingRule::new(
            id,
            new_rule.portal_id,
            new_rule.source,
            new_rule.target,
            new_rule.kind,
            new_rule.logging_enabled,
            new_rule.sort_order,
        );
        rules.push(rule.clone());

        Ok(rule)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let before = rules.len();
        rules.retain(|r| r.id != id);

        Ok(rules.len() < before)
    }
}

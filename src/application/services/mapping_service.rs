//! Mapping snapshot loading and refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain::entities::RuleKind;
use crate::domain::repositories::MappingRepository;
use crate::domain::rule_set::RuleSet;
use crate::error::AppError;

/// How long a failed initial load is reported back before the store is
/// asked again.
const INITIAL_LOAD_RETRY_DELAY: Duration = Duration::from_secs(1);

struct CachedSnapshot {
    loaded_at: Instant,
    rules: Arc<RuleSet>,
}

/// Hands out immutable [`RuleSet`] snapshots of one portal's mapping table.
///
/// A snapshot is reloaded from the repository once it is older than
/// `refresh_after`. Readers never see a half-built table: a new snapshot
/// replaces the old one as a whole.
///
/// Only one task talks to the repository at a time. While it does, other
/// readers keep getting the expired snapshot instead of waiting. A failed
/// reload restarts the expiry of the snapshot it could not replace.
pub struct MappingService {
    repository: Arc<dyn MappingRepository>,
    portal_id: i32,
    refresh_after: Duration,
    snapshot: RwLock<Option<CachedSnapshot>>,
    /// Held while reloading; remembers when an initial load last failed.
    reload: Mutex<Option<Instant>>,
}

impl MappingService {
    /// Creates a new mapping service.
    pub fn new(
        repository: Arc<dyn MappingRepository>,
        portal_id: i32,
        refresh_after: Duration,
    ) -> Self {
        Self {
            repository,
            portal_id,
            refresh_after,
            snapshot: RwLock::new(None),
            reload: Mutex::new(None),
        }
    }

    /// Returns the current snapshot, reloading it if it has expired.
    ///
    /// When a reload fails or is already running in another task, the
    /// expired snapshot keeps being served.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if nothing was ever loaded and the
    /// repository is unavailable.
    pub async fn snapshot(&self) -> Result<Arc<RuleSet>, AppError> {
        let stale = match self.fresh_or_stale().await {
            Ok(fresh) => return Ok(fresh),
            Err(stale) => stale,
        };

        let mut last_failure = match &stale {
            Some(stale) => match self.reload.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Ok(stale.clone()),
            },
            None => self.reload.lock().await,
        };

        // another task may have reloaded before we got the lock
        if let Ok(fresh) = self.fresh_or_stale().await {
            return Ok(fresh);
        }

        if stale.is_none()
            && let Some(failed_at) = *last_failure
            && failed_at.elapsed() < INITIAL_LOAD_RETRY_DELAY
        {
            return Err(AppError::internal(
                "Mapping store unavailable",
                json!({ "portal_id": self.portal_id }),
            ));
        }

        match self.load().await {
            Ok(rules) => {
                let rules = Arc::new(rules);
                *self.snapshot.write().await = Some(CachedSnapshot {
                    loaded_at: Instant::now(),
                    rules: rules.clone(),
                });
                *last_failure = None;
                Ok(rules)
            }
            Err(e) => {
                let mut guard = self.snapshot.write().await;
                match guard.as_mut() {
                    Some(cached) => {
                        warn!("Mapping reload failed, serving previous snapshot: {}", e);
                        cached.loaded_at = Instant::now();
                        Ok(cached.rules.clone())
                    }
                    None => {
                        *last_failure = Some(Instant::now());
                        Err(e)
                    }
                }
            }
        }
    }

    /// The current snapshot if it is still fresh, otherwise the expired one
    /// (if any) as the error value.
    async fn fresh_or_stale(&self) -> Result<Arc<RuleSet>, Option<Arc<RuleSet>>> {
        let guard = self.snapshot.read().await;
        match guard.as_ref() {
            Some(cached) if cached.loaded_at.elapsed() < self.refresh_after => {
                Ok(cached.rules.clone())
            }
            Some(cached) => Err(Some(cached.rules.clone())),
            None => Err(None),
        }
    }

    async fn load(&self) -> Result<RuleSet, AppError> {
        let exact = self
            .repository
            .list_rules(self.portal_id, RuleKind::Exact)
            .await?;
        let patterns = self
            .repository
            .list_rules(self.portal_id, RuleKind::Pattern)
            .await?;

        let rules = RuleSet::compile(exact, patterns);
        info!(
            "Loaded mappings for portal {}: {} exact, {} pattern",
            self.portal_id,
            rules.exact_count(),
            rules.pattern_count()
        );

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{MappingRule, NewMappingRule};
    use crate::domain::repositories::MockMappingRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn exact_rule() -> MappingRule {
        MappingRule::new(
            1,
            0,
            "/old".to_string(),
            "/new".to_string(),
            RuleKind::Exact,
            true,
            0,
        )
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_until_expiry() {
        let mut mock_repo = MockMappingRepository::new();
        mock_repo
            .expect_list_rules()
            .withf(|_, kind| *kind == RuleKind::Exact)
            .times(1)
            .returning(|_, _| Ok(vec![exact_rule()]));
        mock_repo
            .expect_list_rules()
            .withf(|_, kind| *kind == RuleKind::Pattern)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let service = MappingService::new(Arc::new(mock_repo), 0, Duration::from_secs(60));

        let first = service.snapshot().await.unwrap();
        let second = service.snapshot().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.exact_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_snapshot_reloads() {
        let mut mock_repo = MockMappingRepository::new();
        mock_repo
            .expect_list_rules()
            .times(4)
            .returning(|_, _| Ok(vec![]));

        let service = MappingService::new(Arc::new(mock_repo), 0, Duration::ZERO);

        let first = service.snapshot().await.unwrap();
        let second = service.snapshot().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_error_without_previous_snapshot() {
        let mut mock_repo = MockMappingRepository::new();
        mock_repo
            .expect_list_rules()
            .times(1)
            .returning(|_, _| Err(AppError::internal("Database error", json!({}))));

        let service = MappingService::new(Arc::new(mock_repo), 0, Duration::from_secs(60));

        let result = service.snapshot().await;
        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_stale_snapshot_served_when_reload_fails() {
        let mut mock_repo = MockMappingRepository::new();
        let mut seq = mockall::Sequence::new();
        mock_repo
            .expect_list_rules()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, kind| match kind {
                RuleKind::Exact => Ok(vec![exact_rule()]),
                RuleKind::Pattern => Ok(vec![]),
            });
        mock_repo
            .expect_list_rules()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AppError::internal("Database error", json!({}))));

        let service = MappingService::new(Arc::new(mock_repo), 0, Duration::ZERO);

        let first = service.snapshot().await.unwrap();
        let second = service.snapshot().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    /// Loads fine `healthy_calls` times, then stalls and fails.
    struct FlakyRepository {
        calls: AtomicUsize,
        healthy_calls: usize,
        stall: Duration,
    }

    impl FlakyRepository {
        fn new(healthy_calls: usize, stall: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                healthy_calls,
                stall,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MappingRepository for FlakyRepository {
        async fn list_rules(
            &self,
            _portal_id: i32,
            kind: RuleKind,
        ) -> Result<Vec<MappingRule>, AppError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.healthy_calls {
                return Ok(match kind {
                    RuleKind::Exact => vec![exact_rule()],
                    RuleKind::Pattern => vec![],
                });
            }
            tokio::time::sleep(self.stall).await;
            Err(AppError::internal("Database error", json!({})))
        }

        async fn create(&self, _new_rule: NewMappingRule) -> Result<MappingRule, AppError> {
            unimplemented!()
        }

        async fn delete(&self, _id: i64) -> Result<bool, AppError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_readers_do_not_wait_for_failing_reload() {
        let repo = Arc::new(FlakyRepository::new(2, Duration::from_millis(200)));
        let service = Arc::new(MappingService::new(
            repo.clone(),
            0,
            Duration::from_millis(10),
        ));

        let first = service.snapshot().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.snapshot().await })
            })
            .collect();
        for handle in handles {
            let rules = handle.await.unwrap().unwrap();
            assert!(Arc::ptr_eq(&rules, &first));
        }

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(repo.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_reload_restarts_expiry() {
        let repo = Arc::new(FlakyRepository::new(2, Duration::ZERO));
        let service = MappingService::new(repo.clone(), 0, Duration::from_millis(50));

        service.snapshot().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        service.snapshot().await.unwrap();
        service.snapshot().await.unwrap();
        service.snapshot().await.unwrap();

        assert_eq!(repo.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_initial_load_is_not_retried_by_waiters() {
        let repo = Arc::new(FlakyRepository::new(0, Duration::from_millis(100)));
        let service = Arc::new(MappingService::new(
            repo.clone(),
            0,
            Duration::from_secs(60),
        ));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.snapshot().await })
            })
            .collect();
        for handle in handles {
            assert!(matches!(handle.await.unwrap(), Err(AppError::Internal { .. })));
        }

        assert_eq!(repo.calls(), 1);
    }
}

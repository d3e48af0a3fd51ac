#![allow(dead_code)]

use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use seo_redirect::api::routes::app_router;
use seo_redirect::application::services::{MappingService, RedirectMode};
use seo_redirect::domain::entities::{NewMappingRule, RuleKind};
use seo_redirect::domain::log_event::RedirectLogEvent;
use seo_redirect::domain::repositories::MappingRepository;
use seo_redirect::infrastructure::memory::InMemoryMappingRepository;
use seo_redirect::state::AppState;

pub const HOST: &str = "site";
pub const DIAGNOSTICS_TOKEN: &str = "let-me-see";

pub async fn create_mapping(
    repo: &InMemoryMappingRepository,
    source: &str,
    target: &str,
    kind: RuleKind,
    logging_enabled: bool,
) {
    repo.create(NewMappingRule {
        portal_id: 0,
        source: source.to_string(),
        target: target.to_string(),
        kind,
        logging_enabled,
        sort_order: 0,
    })
    .await
    .unwrap();
}

pub fn create_test_state(
    repo: Arc<InMemoryMappingRepository>,
    mode: RedirectMode,
) -> (AppState, mpsc::Receiver<RedirectLogEvent>) {
    let (tx, rx) = mpsc::channel(100);

    let mapping_service = Arc::new(MappingService::new(repo, 0, Duration::from_secs(60)));

    let state = AppState::new(mapping_service, tx, 0, mode)
        .with_diagnostics_token(Some(DIAGNOSTICS_TOKEN.to_string()));

    (state, rx)
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(app_router(state)).unwrap()
}

/// Everything enqueued for the log worker so far.
pub fn drain_log_events(rx: &mut mpsc::Receiver<RedirectLogEvent>) -> Vec<RedirectLogEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use seo_redirect::application::services::{LogService, RedirectMode};
use seo_redirect::domain::entities::RuleKind;
use seo_redirect::domain::log_worker::run_log_worker;
use seo_redirect::infrastructure::memory::{
    InMemoryMappingRepository, InMemoryRedirectLogRepository,
};

async fn wait_for_entries(repo: &InMemoryRedirectLogRepository, expected: usize) {
    for _ in 0..100 {
        if repo.entries().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} log entries, got {}",
        expected,
        repo.entries().len()
    );
}

#[tokio::test]
async fn test_unhandled_urls_flow_from_requests_to_review() {
    let mappings = Arc::new(InMemoryMappingRepository::new());
    common::create_mapping(&mappings, "/oldpage", "/newpage", RuleKind::Exact, true).await;

    let (state, rx) = common::create_test_state(mappings, RedirectMode::default());
    let log_repo = Arc::new(InMemoryRedirectLogRepository::new());
    tokio::spawn(run_log_worker(rx, log_repo.clone()));
    let server = common::create_test_server(state);

    for path in ["/gone", "/gone", "/Gone", "/also-gone", "/oldpage"] {
        server.get(path).add_header("Host", common::HOST).await;
    }

    wait_for_entries(&log_repo, 5).await;

    let service = LogService::new(log_repo.clone());
    let urls = service.top_unhandled_urls(0, 1, 10).await.unwrap();

    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].url, "http://site/gone");
    assert_eq!(urls[0].occurrences, 3);
    assert_eq!(urls[1].url, "http://site/also-gone");
    assert_eq!(urls[1].occurrences, 1);

    let handled = service.mark_handled("http://site/GONE", "alice").await.unwrap();
    assert_eq!(handled, 3);

    let urls = service.top_unhandled_urls(0, 1, 10).await.unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].url, "http://site/also-gone");
}

#[tokio::test]
async fn test_mapped_requests_are_not_unhandled() {
    let mappings = Arc::new(InMemoryMappingRepository::new());
    common::create_mapping(&mappings, "/oldpage", "/newpage", RuleKind::Exact, true).await;

    let (state, rx) = common::create_test_state(mappings, RedirectMode::default());
    let log_repo = Arc::new(InMemoryRedirectLogRepository::new());
    tokio::spawn(run_log_worker(rx, log_repo.clone()));
    let server = common::create_test_server(state);

    server.get("/oldpage").add_header("Host", common::HOST).await;

    wait_for_entries(&log_repo, 1).await;

    let entries = log_repo.entries();
    assert!(entries[0].mapping_found);
    assert_eq!(entries[0].target, "/newpage");

    let service = LogService::new(log_repo);
    assert!(service.top_unhandled_urls(0, 1, 10).await.unwrap().is_empty());
}

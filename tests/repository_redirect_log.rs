use chrono::{DateTime, Duration, Utc};
use seo_redirect::domain::entities::{NewRedirectLogEntry, UnhandledUrl};
use seo_redirect::domain::repositories::RedirectLogRepository;
use seo_redirect::infrastructure::persistence::PgRedirectLogRepository;
use sqlx::PgPool;
use std::sync::Arc;

fn entry(
    portal_id: i32,
    url: &str,
    logged_at: DateTime<Utc>,
    mapping_found: bool,
) -> NewRedirectLogEntry {
    NewRedirectLogEntry {
        portal_id,
        incoming_url: url.to_string(),
        logged_at,
        referrer: String::new(),
        user_agent: "Mozilla/5.0".to_string(),
        target: if mapping_found {
            "/newpage".to_string()
        } else {
            String::new()
        },
        mapping_found,
    }
}

async fn append_times(repo: &PgRedirectLogRepository, new_entry: NewRedirectLogEntry, times: usize) {
    for _ in 0..times {
        repo.append(new_entry.clone()).await.unwrap();
    }
}

#[sqlx::test]
async fn test_append_entry(pool: PgPool) {
    let repo = PgRedirectLogRepository::new(Arc::new(pool.clone()));
    let now = Utc::now();

    let result = repo.append(entry(0, "http://site/missing", now, false)).await;

    assert!(result.is_ok());
    let logged = result.unwrap();
    assert!(logged.id > 0);
    assert_eq!(logged.incoming_url, "http://site/missing");
    assert!(logged.handled_on.is_none());

    let stored: (String, bool) =
        sqlx::query_as("SELECT user_agent, mapping_found FROM redirect_log WHERE id = $1")
            .bind(logged.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, ("Mozilla/5.0".to_string(), false));
}

#[sqlx::test]
async fn test_top_unhandled_urls_grouped_and_ordered(pool: PgPool) {
    let repo = PgRedirectLogRepository::new(Arc::new(pool));
    let now = Utc::now();

    append_times(&repo, entry(0, "http://site/rare", now, false), 1).await;
    append_times(&repo, entry(0, "http://site/frequent", now, false), 3).await;
    append_times(&repo, entry(0, "http://site/middle", now, false), 2).await;

    let urls = repo
        .top_unhandled_urls(0, now - Duration::days(1), 10)
        .await
        .unwrap();

    assert_eq!(
        urls,
        vec![
            UnhandledUrl {
                url: "http://site/frequent".to_string(),
                occurrences: 3,
            },
            UnhandledUrl {
                url: "http://site/middle".to_string(),
                occurrences: 2,
            },
            UnhandledUrl {
                url: "http://site/rare".to_string(),
                occurrences: 1,
            },
        ]
    );
}

#[sqlx::test]
async fn test_top_unhandled_urls_respects_limit(pool: PgPool) {
    let repo = PgRedirectLogRepository::new(Arc::new(pool));
    let now = Utc::now();

    append_times(&repo, entry(0, "http://site/a", now, false), 2).await;
    append_times(&repo, entry(0, "http://site/b", now, false), 1).await;

    let urls = repo
        .top_unhandled_urls(0, now - Duration::days(1), 1)
        .await
        .unwrap();

    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].url, "http://site/a");
}

#[sqlx::test]
async fn test_top_unhandled_urls_excludes_other_records(pool: PgPool) {
    let repo = PgRedirectLogRepository::new(Arc::new(pool));
    let now = Utc::now();

    append_times(&repo, entry(0, "http://site/redirected", now, true), 5).await;
    append_times(&repo, entry(0, "http://site/old", now - Duration::days(40), false), 5).await;
    append_times(&repo, entry(1, "http://site/other-portal", now, false), 5).await;
    append_times(&repo, entry(0, "http://site/handled", now, false), 5).await;
    append_times(&repo, entry(0, "http://site/open", now, false), 1).await;
    repo.mark_handled("http://site/handled", now, "admin")
        .await
        .unwrap();

    let urls = repo
        .top_unhandled_urls(0, now - Duration::days(30), 10)
        .await
        .unwrap();

    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].url, "http://site/open");
}

#[sqlx::test]
async fn test_mark_handled_only_touches_unhandled(pool: PgPool) {
    let repo = PgRedirectLogRepository::new(Arc::new(pool.clone()));
    let now = Utc::now();

    append_times(&repo, entry(0, "http://site/old", now, false), 3).await;

    let updated = repo
        .mark_handled("http://site/old", now, "admin")
        .await
        .unwrap();
    assert_eq!(updated, 3);

    let again = repo
        .mark_handled("http://site/old", now, "someone-else")
        .await
        .unwrap();
    assert_eq!(again, 0);

    let handled_by: Vec<String> =
        sqlx::query_scalar("SELECT handled_by FROM redirect_log WHERE incoming_url = $1")
            .bind("http://site/old")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert!(handled_by.iter().all(|user| user == "admin"));
}

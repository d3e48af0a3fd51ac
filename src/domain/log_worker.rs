//! Background worker persisting redirect log events.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info};

use crate::domain::log_event::RedirectLogEvent;
use crate::domain::repositories::RedirectLogRepository;

const MAX_RETRIES: usize = 3;

/// Drains the log queue until every sender is dropped.
///
/// Each event is appended with exponential backoff. An event that still
/// fails is dropped and counted; it is never re-queued, so a request can't
/// end up logged twice.
pub async fn run_log_worker(
    mut rx: mpsc::Receiver<RedirectLogEvent>,
    repository: Arc<dyn RedirectLogRepository>,
) {
    while let Some(event) = rx.recv().await {
        let entry = event.into_new_entry();
        let incoming = entry.incoming_url.clone();

        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(MAX_RETRIES);

        let result = Retry::spawn(strategy, || {
            let repository = repository.clone();
            let entry = entry.clone();
            async move { repository.append(entry).await }
        })
        .await;

        match result {
            Ok(saved) => debug!("Redirect log {} written for {}", saved.id, incoming),
            Err(e) => {
                metrics::counter!("redirect_log_failed_total").increment(1);
                error!("Failed to write redirect log for {}: {}", incoming, e);
            }
        }
    }

    info!("Redirect log worker stopped");
}

//! Redirect decision and logging for a single request.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::application::services::MappingService;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::log_event::RedirectLogEvent;
use crate::domain::request_context::RequestContext;
use crate::error::RedirectError;
use crate::utils::incoming_url::{RawRequest, extract_incoming_url, has_error_path};

/// Caller-supplied switches for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectMode {
    /// Try the mapping table even when the URL shows no not-found marker.
    pub redirect_when_not_found_not_detected: bool,
    /// Skip logging of regular (non not-found) requests without a mapping.
    pub only_log_when_not_found: bool,
}

/// What the host should do with the request.
#[derive(Debug)]
pub enum RedirectOutcome {
    /// Answer `301 Moved Permanently` to `location` and stop.
    Redirect { location: String },
    /// Answer with the not-found status; the request is the host's own
    /// error page and must not be resolved again.
    NotFound,
    /// No redirect; continue with default handling.
    Continue,
    /// Resolution failed; the failure was logged and the request continues
    /// with default handling.
    Recovered(RedirectError),
}

impl RedirectOutcome {
    /// Short label used as a metrics dimension.
    pub fn label(&self) -> &'static str {
        match self {
            RedirectOutcome::Redirect { .. } => "redirect",
            RedirectOutcome::NotFound => "not_found",
            RedirectOutcome::Continue => "continue",
            RedirectOutcome::Recovered(_) => "recovered",
        }
    }
}

/// Resolves incoming URLs against the mapping table and decides whether to
/// redirect and whether to log.
///
/// May be invoked several times for one request as long as the same
/// [`RequestContext`] is passed each time: the not-found determination is
/// kept from the first call and at most one log record is written.
pub struct RedirectService {
    mappings: Arc<MappingService>,
    log_sender: mpsc::Sender<RedirectLogEvent>,
    portal_id: i32,
}

impl RedirectService {
    /// Creates a new redirect service.
    pub fn new(
        mappings: Arc<MappingService>,
        log_sender: mpsc::Sender<RedirectLogEvent>,
        portal_id: i32,
    ) -> Self {
        Self {
            mappings,
            log_sender,
            portal_id,
        }
    }

    /// Runs the whole decision for `request`.
    ///
    /// Never fails: any error is logged, reported to `diagnostics` and
    /// returned as [`RedirectOutcome::Recovered`].
    pub async fn resolve_and_redirect(
        &self,
        ctx: &RequestContext,
        request: &RawRequest,
        mode: RedirectMode,
        diagnostics: &mut Diagnostics,
    ) -> RedirectOutcome {
        let outcome = match self.try_resolve(ctx, request, mode, diagnostics).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Redirect resolution failed for {}: {}",
                    request.raw_path_and_query, e
                );
                metrics::counter!("redirect_failures_total", "kind" => e.kind()).increment(1);
                diagnostics.add(format!("Error: {}", e));
                RedirectOutcome::Recovered(e)
            }
        };

        metrics::counter!("redirect_outcomes_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn try_resolve(
        &self,
        ctx: &RequestContext,
        request: &RawRequest,
        mode: RedirectMode,
        diagnostics: &mut Diagnostics,
    ) -> Result<RedirectOutcome, RedirectError> {
        diagnostics.add(format!("RawUrl: {}", request.raw_path_and_query));
        diagnostics.add(format!("AbsoluteUri: {}", request.absolute_uri()));

        let extracted = extract_incoming_url(request);
        // rules are matched case-insensitively
        let incoming = extracted.url.to_lowercase();
        let is_not_found = extracted.is_not_found;
        ctx.set_not_found_detected(is_not_found);

        // the host's error page re-entering: resolving it again would loop
        if has_error_path(&incoming) {
            debug!("Error path in incoming url, not resolving: {}", incoming);
            return Ok(RedirectOutcome::NotFound);
        }

        diagnostics.add(format!("Incoming: {}", incoming));

        let mut target = String::new();
        let mut logging_allowed = true;

        if is_not_found || mode.redirect_when_not_found_not_detected {
            debug!("Try to find a mapping for [{}]", incoming);
            let rules = self
                .mappings
                .snapshot()
                .await
                .map_err(RedirectError::MappingStore)?;

            diagnostics.add(format!("Mappings (with regex): {}", rules.pattern_count()));
            diagnostics.add(format!("Mappings (no regex): {}", rules.exact_count()));

            let site_root = request.site_root().to_lowercase();
            if let Some(found) = rules.find_target(&incoming, &site_root) {
                ctx.set_mapping_found();
                logging_allowed = found.logging_enabled;
                target = found.target;
            }
        }

        if !logging_allowed {
            // claims the slot without writing, so a later invocation can't log either
            ctx.try_claim_log();
        }

        let found_target = !target.is_empty();
        let log_as_not_found =
            is_not_found || (mode.redirect_when_not_found_not_detected && found_target);
        if logging_allowed && (log_as_not_found || !mode.only_log_when_not_found) {
            debug!(
                "Logging redirect: is_not_found: {}, redirect_when_not_found_not_detected: {}, target: [{}]",
                is_not_found, mode.redirect_when_not_found_not_detected, target
            );
            self.add_redirect_log(ctx, request, &incoming, &target)?;
        }

        diagnostics.add(format!("Target: {}", target));

        if found_target {
            debug!("Redirect to: [{}]", target);
            return Ok(RedirectOutcome::Redirect { location: target });
        }

        // diagnostics are only surfaced for not-found requests
        if !is_not_found {
            diagnostics.clear();
        }

        Ok(RedirectOutcome::Continue)
    }

    /// Queues the log record unless this request already has one.
    ///
    /// The slot is claimed before the event is queued, so a full queue drops
    /// the record rather than risking a duplicate later.
    fn add_redirect_log(
        &self,
        ctx: &RequestContext,
        request: &RawRequest,
        incoming: &str,
        target: &str,
    ) -> Result<(), RedirectError> {
        if !ctx.try_claim_log() {
            return Ok(());
        }

        let event = RedirectLogEvent::new(
            self.portal_id,
            incoming.to_string(),
            request.referrer.as_deref(),
            request.user_agent.as_deref(),
            target.to_string(),
            ctx.mapping_found(),
        );

        match self.log_sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                metrics::counter!("redirect_log_dropped_total").increment(1);
                warn!("Redirect log queue full, dropped {}", event.incoming_url);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(RedirectError::LogQueueClosed),
        }
    }
}

//! Not-found interception middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::application::services::{RedirectMode, RedirectOutcome};
use crate::domain::diagnostics::Diagnostics;
use crate::domain::request_context::RequestContext;
use crate::state::AppState;
use crate::utils::raw_request::raw_request_from_parts;

/// Header a caller sends to receive diagnostics in not-found responses.
pub const DIAGNOSTICS_HEADER: &str = "x-diagnostics-token";

/// Resolves requests against the mapping table, before and after routing.
///
/// # Flow
///
/// 1. Early pass with the configured mode, logging restricted to not-found
///    re-entries. A mapping answers `301 Moved Permanently`; the host's
///    own error page answers `404` at once.
/// 2. The request is routed.
/// 3. If routing produced `404`, a late pass tries the mapping table for
///    every request and may still redirect. It is skipped when the early
///    pass already failed.
/// 4. A request recognised as a not-found re-entry never leaves with a
///    status other than `404`.
///
/// Both passes share one [`RequestContext`], stored in the request
/// extensions, so a request is logged at most once.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .fallback(not_found_handler)
///     .layer(middleware::from_fn_with_state(state.clone(), redirect::layer));
/// ```
pub async fn layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let raw = match raw_request_from_parts(req.headers(), req.uri(), state.behind_proxy) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Skipping redirect resolution: {}", e);
            return next.run(req).await;
        }
    };

    let privileged = state.is_privileged(
        req.headers()
            .get(DIAGNOSTICS_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let mut diagnostics = Diagnostics::new(privileged);

    let ctx = Arc::new(RequestContext::new());
    req.extensions_mut().insert(ctx.clone());

    let early_mode = RedirectMode {
        redirect_when_not_found_not_detected: state.redirect_mode.redirect_when_not_found_not_detected,
        only_log_when_not_found: true,
    };
    let early_recovered = match state
        .redirect_service
        .resolve_and_redirect(&ctx, &raw, early_mode, &mut diagnostics)
        .await
    {
        RedirectOutcome::Redirect { location } => return moved_permanently(&location),
        RedirectOutcome::NotFound => return not_found(&diagnostics),
        RedirectOutcome::Continue => false,
        RedirectOutcome::Recovered(_) => true,
    };

    let mut response = next.run(req).await;

    if response.status() == StatusCode::NOT_FOUND {
        // the failure is already reported; a second attempt would only repeat it
        if !early_recovered {
            let late_mode = RedirectMode {
                redirect_when_not_found_not_detected: true,
                only_log_when_not_found: state.redirect_mode.only_log_when_not_found,
            };
            if let RedirectOutcome::Redirect { location } = state
                .redirect_service
                .resolve_and_redirect(&ctx, &raw, late_mode, &mut diagnostics)
                .await
            {
                return moved_permanently(&location);
            }
        }

        if !diagnostics.is_empty() {
            return not_found(&diagnostics);
        }
    }

    if ctx.not_found_detected() && response.status() != StatusCode::NOT_FOUND {
        *response.status_mut() = StatusCode::NOT_FOUND;
    }

    response
}

fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            warn!("Mapped target is not a valid Location header: {}", location);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}

fn not_found(diagnostics: &Diagnostics) -> Response {
    if diagnostics.is_empty() {
        (StatusCode::NOT_FOUND, "Not Found").into_response()
    } else {
        (StatusCode::NOT_FOUND, diagnostics.render()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_moved_permanently_sets_location() {
        let response = moved_permanently("http://site/newpage");

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "http://site/newpage"
        );
    }

    #[test]
    fn test_moved_permanently_rejects_invalid_location() {
        let response = moved_permanently("http://site/\nbad");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_renders_diagnostics() {
        let mut diagnostics = Diagnostics::new(true);
        diagnostics.add("Incoming: http://site/x");

        let response: Response<Body> = not_found(&diagnostics);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(&body[..], b"Incoming: http://site/x");
    }
}

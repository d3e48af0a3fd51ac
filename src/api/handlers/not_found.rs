//! Fallback for unrouted requests.

use axum::http::StatusCode;

/// Plain `404 Not Found` for every path without a route.
///
/// The redirect middleware sees this status and gets a last chance to
/// answer with a mapping.
pub async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

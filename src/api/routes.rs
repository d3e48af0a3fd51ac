//! Router configuration.
//!
//! # Route Structure
//!
//! - `GET /health` - Health check: mapping store, log queue
//! - anything else - `404 Not Found`, subject to redirect resolution
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Redirect** - Mapping lookup before routing and on `404` responses

use axum::routing::get;
use axum::{Router, middleware};

use crate::api::handlers::{health_handler, not_found_handler};
use crate::api::middleware::{redirect, tracing};
use crate::state::AppState;

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), redirect::layer))
        .with_state(state)
        .layer(tracing::layer())
}

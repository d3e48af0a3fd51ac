//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Mappings**: Loads the mapping snapshot (served from memory while fresh)
/// 2. **Log Queue**: Checks if the channel is open and reports free capacity
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "mappings": {
///       "status": "ok",
///       "message": "12 exact, 3 pattern"
///     },
///     "log_queue": {
///       "status": "ok",
///       "message": "Capacity: 10000"
///     }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let mappings_check = check_mappings(&state).await;

    let queue_check = check_log_queue(&state);

    let all_healthy = mappings_check.is_ok() && queue_check.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            mappings: mappings_check,
            log_queue: queue_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Checks that a mapping snapshot can be served.
async fn check_mappings(state: &AppState) -> CheckStatus {
    match state.mapping_service.snapshot().await {
        Ok(rules) => CheckStatus::ok(format!(
            "{} exact, {} pattern",
            rules.exact_count(),
            rules.pattern_count()
        )),
        Err(e) => CheckStatus::error(format!("Mapping store error: {}", e)),
    }
}

/// Checks if the redirect log queue is operational.
fn check_log_queue(state: &AppState) -> CheckStatus {
    if state.log_sender.is_closed() {
        CheckStatus::error("Log queue is closed")
    } else {
        CheckStatus::ok(format!("Capacity: {}", state.log_sender.capacity()))
    }
}

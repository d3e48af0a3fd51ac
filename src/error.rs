use serde_json::{Value, json};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    Conflict { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    fn parts(&self) -> (&'static str, &str, &Value) {
        match self {
            AppError::Validation { message, details } => ("validation_error", message, details),
            AppError::NotFound { message, details } => ("not_found", message, details),
            AppError::Conflict { message, details } => ("conflict", message, details),
            AppError::Internal { message, details } => ("internal_error", message, details),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (code, message, details) = self.parts();
        write!(f, "{}: {}", code, message)?;
        match details {
            Value::Null => Ok(()),
            Value::Object(map) if map.is_empty() => Ok(()),
            details => write!(f, " {}", details),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        map_sqlx_error(e)
    }
}

pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    if let Some(db) = e.as_database_error()
        && db.is_unique_violation()
    {
        return AppError::conflict(
            "Unique constraint violation",
            json!({ "constraint": db.constraint() }),
        );
    }

    tracing::error!("Database error: {}", e);
    AppError::internal("Database error", json!({}))
}

/// Failures recovered inside the redirect decision.
///
/// None of these reach the host: they are reported through
/// [`crate::application::services::RedirectOutcome::Recovered`].
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("Mapping store unavailable: {0}")]
    MappingStore(AppError),

    #[error("Redirect log queue is closed")]
    LogQueueClosed,
}

impl RedirectError {
    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            RedirectError::MappingStore(_) => "mapping_store",
            RedirectError::LogQueueClosed => "log_queue_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::internal("Database error", json!({}));
        assert_eq!(err.to_string(), "internal_error: Database error");
    }

    #[test]
    fn test_app_error_display_with_details() {
        let err = AppError::not_found("No unhandled log records for url", json!({ "url": "http://site/x" }));
        assert_eq!(
            err.to_string(),
            r#"not_found: No unhandled log records for url {"url":"http://site/x"}"#
        );
    }

    #[test]
    fn test_redirect_error_wraps_store_error() {
        let err = RedirectError::MappingStore(AppError::internal("Database error", json!({})));
        assert_eq!(
            err.to_string(),
            "Mapping store unavailable: internal_error: Database error"
        );
        assert_eq!(err.kind(), "mapping_store");
        assert_eq!(RedirectError::LogQueueClosed.kind(), "log_queue_closed");
    }
}

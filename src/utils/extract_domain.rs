//! Host extraction from HTTP request headers.

use crate::AppError;
use axum::http::{HeaderMap, Uri, header};

/// Host of a request, with and without the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHost {
    /// Lowercased host name, port removed.
    pub host: String,
    /// Lowercased `Host` value as sent, port included.
    pub authority: String,
}

/// Extracts the request host from the `Host` header.
///
/// Falls back to the URI authority (HTTP/2 requests carry `:authority`
/// instead of `Host`). Handles:
/// - IPv4 addresses (e.g., `192.168.1.1`)
/// - IPv6 addresses (e.g., `[::1]`)
/// - Hostnames with ports (e.g., `example.com:3000`)
/// - Plain hostnames (e.g., `example.com`)
///
/// # Errors
///
/// Returns [`AppError::Validation`] if:
/// - Neither a `Host` header nor a URI authority is present
/// - The header value contains invalid UTF-8
pub fn extract_host(headers: &HeaderMap, uri: &Uri) -> Result<RequestHost, AppError> {
    let authority = match headers.get(header::HOST) {
        Some(value) => value
            .to_str()
            .map_err(|_| AppError::bad_request("Invalid Host header", serde_json::json!({})))?
            .to_string(),
        None => uri
            .authority()
            .map(|a| a.as_str().to_string())
            .ok_or_else(|| AppError::bad_request("Missing Host header", serde_json::json!({})))?,
    };
    let authority = authority.to_lowercase();

    let host = if authority.starts_with('[') {
        // IPv6 address (e.g., [::1] or [::1]:8080)
        match authority.find(']') {
            Some(end_bracket) => authority[..=end_bracket].to_string(),
            None => authority.clone(),
        }
    } else {
        authority
            .split(':')
            .next()
            .unwrap_or(&authority)
            .to_string()
    };

    Ok(RequestHost { host, authority })
}

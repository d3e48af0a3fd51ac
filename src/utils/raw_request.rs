//! Building a [`RawRequest`] from an HTTP request.

use axum::http::{HeaderMap, Uri, header};

use crate::AppError;
use crate::utils::extract_domain::extract_host;
use crate::utils::incoming_url::RawRequest;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Collects what the resolver needs from request headers and URI.
///
/// The scheme is `https` only when `behind_proxy` is set and the proxy
/// reports it through `X-Forwarded-Proto`; otherwise `http`.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if the host cannot be determined.
pub fn raw_request_from_parts(
    headers: &HeaderMap,
    uri: &Uri,
    behind_proxy: bool,
) -> Result<RawRequest, AppError> {
    let host = extract_host(headers, uri)?;

    let raw_path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    Ok(RawRequest {
        raw_path_and_query,
        scheme: request_scheme(headers, behind_proxy).to_string(),
        host: host.host,
        authority: host.authority,
        referrer: header_value(headers, header::REFERER.as_str()),
        user_agent: header_value(headers, header::USER_AGENT.as_str()),
    })
}

fn request_scheme(headers: &HeaderMap, behind_proxy: bool) -> &'static str {
    if !behind_proxy {
        return "http";
    }

    // a proxy chain may send "https, http"; the first hop is the client's
    let forwarded = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);

    match forwarded {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

//! Derivation of the "true" incoming URL from a raw request.
//!
//! A request reaching the resolver may be a plain request, or a re-entry from
//! the host's error pipeline carrying the original URL:
//!
//! ```text
//! /404.aspx?404;http://dev.local:80/old.asp?id=123    marker form
//! /404.aspx?aspxerrorpath=/some/old/page.aspx         error-path form
//! ```

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static NOT_FOUND_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*(?i:404;)(.*)").expect("valid marker regex"));

static ERROR_PATH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*(?i:aspxerrorpath=)(.*)").expect("valid error path regex"));

/// The parts of an HTTP request the resolver needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    /// Path and query exactly as received, still percent-encoded.
    pub raw_path_and_query: String,
    /// `http` or `https`.
    pub scheme: String,
    /// Host name without port.
    pub host: String,
    /// Host header value, port included when present.
    pub authority: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl RawRequest {
    /// `scheme://host`, the root every site-relative URL is qualified with.
    pub fn site_root(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Absolute request URI (`scheme://authority` + path and query).
    pub fn absolute_uri(&self) -> String {
        format!(
            "{}://{}{}",
            self.scheme, self.authority, self.raw_path_and_query
        )
    }
}

/// Result of URL extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingUrl {
    pub url: String,
    pub is_not_found: bool,
}

/// Returns true if `url` carries the host's error-path marker.
pub fn has_error_path(url: &str) -> bool {
    ERROR_PATH_MARKER.is_match(url)
}

/// Derives the incoming URL and whether the request is a not-found re-entry.
///
/// Tried in order, first success wins:
///
/// 1. `404;<url>` marker in the raw path: the embedded URL, port removed
/// 2. Marker present only once the absolute URI is decoded: `scheme://host` + raw path
/// 3. `aspxerrorpath=<path>`: the path qualified under `scheme://host`
/// 4. Otherwise `scheme://host` + raw path, not a not-found request
///
/// An empty capture in steps 1 and 3 counts as no match.
pub fn extract_incoming_url(request: &RawRequest) -> IncomingUrl {
    let raw = request.raw_path_and_query.as_str();

    if let Some(embedded) = capture_non_empty(&NOT_FOUND_MARKER, raw) {
        let url = strip_port(embedded);
        debug!("Incoming found with \"404;\" marker: {}", url);
        return IncomingUrl {
            url,
            is_not_found: true,
        };
    }

    let decoded = decode_uri(&request.absolute_uri());
    if NOT_FOUND_MARKER.is_match(&decoded) {
        let url = format!("{}{}", request.site_root(), raw);
        debug!("Incoming found with decoded absolute URI: {}", url);
        return IncomingUrl {
            url,
            is_not_found: true,
        };
    }

    if let Some(path) = capture_non_empty(&ERROR_PATH_MARKER, raw) {
        let separator = if path.starts_with('/') { "" } else { "/" };
        let url = format!("{}{}{}", request.site_root(), separator, path);
        debug!("Incoming found with error path: {}", url);
        return IncomingUrl {
            url,
            is_not_found: true,
        };
    }

    let url = format!("{}{}", request.site_root(), raw);
    debug!("Incoming for regular request: {}", url);
    IncomingUrl {
        url,
        is_not_found: false,
    }
}

fn capture_non_empty<'a>(regex: &Regex, haystack: &'a str) -> Option<&'a str> {
    regex
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

/// Form-style decoding: `%XX` sequences and `+` as space.
fn decode_uri(uri: &str) -> String {
    let spaced = uri.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Removes an explicit `:<digits>` port from the authority of `url`.
///
/// Only the authority is touched; colons in the path or query are kept.
fn strip_port(url: &str) -> String {
    let authority_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    let authority_end = url[authority_start..]
        .find(['/', '?', '#'])
        .map(|i| authority_start + i)
        .unwrap_or(url.len());

    let authority = &url[authority_start..authority_end];
    let Some(colon) = authority.rfind(':') else {
        return url.to_string();
    };

    // "[::1]" has colons but no digits-only suffix
    let port = &authority[colon + 1..];
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return url.to_string();
    }

    format!(
        "{}{}{}",
        &url[..authority_start],
        &authority[..colon],
        &url[authority_end..]
    )
}

//! Request parsing helpers.
//!
//! - [`incoming_url`] - Derivation of the true incoming URL
//! - [`extract_domain`] - Host extraction from HTTP headers
//! - [`raw_request`] - Resolver input built from an HTTP request

pub mod extract_domain;
pub mod incoming_url;
pub mod raw_request;

//! Per-request state shared by every resolver invocation of one request.
//!
//! The resolver can run twice for a single request (early interception and
//! the late not-found hook). The flags here make both runs behave as one:
//! the first not-found determination sticks, and at most one log record is
//! written.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Idempotency flags scoped to a single request.
///
/// Lives in the request extensions; never shared between requests.
#[derive(Debug, Default)]
pub struct RequestContext {
    not_found_detected: OnceLock<bool>,
    already_logged: AtomicBool,
    mapping_found: AtomicBool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether the request is a not-found re-entry.
    ///
    /// Only the first call has an effect.
    pub fn set_not_found_detected(&self, is_not_found: bool) {
        let _ = self.not_found_detected.set(is_not_found);
    }

    /// The recorded not-found determination, `false` if none yet.
    pub fn not_found_detected(&self) -> bool {
        self.not_found_detected.get().copied().unwrap_or(false)
    }

    /// Claims the single log slot of this request.
    ///
    /// Returns `true` for the caller that should write the record; every
    /// later call returns `false`. Also used to suppress logging without
    /// writing anything.
    pub fn try_claim_log(&self) -> bool {
        !self.already_logged.swap(true, Ordering::AcqRel)
    }

    pub fn already_logged(&self) -> bool {
        self.already_logged.load(Ordering::Acquire)
    }

    pub fn set_mapping_found(&self) {
        self.mapping_found.store(true, Ordering::Release);
    }

    pub fn mapping_found(&self) -> bool {
        self.mapping_found.load(Ordering::Acquire)
    }
}

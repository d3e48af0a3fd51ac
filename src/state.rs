//! Shared application state injected into handlers and middleware.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{MappingService, RedirectMode, RedirectService};
use crate::domain::log_event::RedirectLogEvent;

#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<RedirectService>,
    pub mapping_service: Arc<MappingService>,
    pub log_sender: mpsc::Sender<RedirectLogEvent>,
    /// Mode of the early interceptor pass.
    pub redirect_mode: RedirectMode,
    pub behind_proxy: bool,
    pub diagnostics_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        mapping_service: Arc<MappingService>,
        log_sender: mpsc::Sender<RedirectLogEvent>,
        portal_id: i32,
        redirect_mode: RedirectMode,
    ) -> Self {
        let redirect_service = Arc::new(RedirectService::new(
            mapping_service.clone(),
            log_sender.clone(),
            portal_id,
        ));

        Self {
            redirect_service,
            mapping_service,
            log_sender,
            redirect_mode,
            behind_proxy: false,
            diagnostics_token: None,
        }
    }

    pub fn with_behind_proxy(mut self, behind_proxy: bool) -> Self {
        self.behind_proxy = behind_proxy;
        self
    }

    pub fn with_diagnostics_token(mut self, token: Option<String>) -> Self {
        self.diagnostics_token = token.map(Arc::from);
        self
    }

    /// Whether a caller presenting `token` may see diagnostics output.
    pub fn is_privileged(&self, token: Option<&str>) -> bool {
        match (&self.diagnostics_token, token) {
            (Some(expected), Some(given)) => expected.as_ref() == given,
            _ => false,
        }
    }
}

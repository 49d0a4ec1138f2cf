//! Application state.

use std::sync::Arc;

use lens_rtc::SessionManager;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub manager: Arc<SessionManager>,
}

impl AppState {
    pub fn new(config: ApiConfig, manager: Arc<SessionManager>) -> Self {
        Self { config, manager }
    }
}

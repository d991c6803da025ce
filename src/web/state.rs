// src/web/state.rs
// Shared state handed to every request handler

use std::sync::Arc;
use tokio::sync::Notify;

use crate::assistant::AssistantApi;
use crate::config::EnvConfig;
use crate::diagnostics::DiagnosticLog;
use crate::resolver::QueryResolver;
use crate::selection::SelectionRecorder;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<QueryResolver>,
    pub selections: Arc<SelectionRecorder>,
    pub diagnostics: Arc<DiagnosticLog>,
    /// Result window for /query
    pub max_intents: usize,
    /// Present only when GET /kill is enabled
    pub kill_switch: Option<Arc<Notify>>,
}

impl AppState {
    pub fn new(resolver: Arc<QueryResolver>, diagnostics: Arc<DiagnosticLog>, max_intents: usize) -> Self {
        Self {
            resolver,
            selections: Arc::new(SelectionRecorder::new()),
            diagnostics,
            max_intents,
            kill_switch: None,
        }
    }

    /// Wire the whole service from configuration and an assistant client
    pub fn from_config(config: &EnvConfig, assistant_id: &str, api: Arc<dyn AssistantApi>) -> Self {
        let diagnostics = Arc::new(DiagnosticLog::new());
        let sessions = Arc::new(SessionManager::new(api, assistant_id, config.timeout));
        let resolver = Arc::new(QueryResolver::new(
            sessions,
            diagnostics.clone(),
            config.fallback_policy,
            config.timeout,
        ));

        let state = Self::new(resolver, diagnostics, config.max_intents);
        if config.enable_kill_endpoint {
            state.with_kill_switch()
        } else {
            state
        }
    }

    pub fn with_kill_switch(mut self) -> Self {
        self.kill_switch = Some(Arc::new(Notify::new()));
        self
    }
}

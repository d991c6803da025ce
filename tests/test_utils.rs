//! Test utilities for wafaq integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use wafaq::assistant::{AssistantApi, IntentCandidate, MessageInput, MessageResponse};
use wafaq::diagnostics::DiagnosticLog;
use wafaq::resolver::{FallbackPolicy, QueryResolver};
use wafaq::session::SessionManager;
use wafaq::web::{AppState, create_router};
use wafaq::{Result, WafaqError};

/// What the scripted assistant answers to the next classification request
pub enum Scripted {
    Intents(Vec<(&'static str, f64)>),
    Expired,
    Fail(&'static str),
}

/// Assistant that replays a script and counts what it was asked
#[derive(Default)]
pub struct ScriptedAssistant {
    script: Mutex<VecDeque<Scripted>>,
    sessions_created: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssistantApi for ScriptedAssistant {
    async fn create_session(&self, assistant_id: &str) -> Result<String> {
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{assistant_id}-session-{n}"))
    }

    async fn send_message(
        &self,
        _assistant_id: &str,
        _session_id: &str,
        input: &MessageInput,
    ) -> Result<MessageResponse> {
        if let Some(forced) = input.intents.first() {
            return Ok(MessageResponse::with_text(format!("Answer: {}", forced.intent)));
        }

        self.queries.lock().unwrap().push(input.text.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Intents(list)) => Ok(MessageResponse::with_intents(
                list.into_iter()
                    .map(|(name, conf)| IntentCandidate::new(name, conf))
                    .collect(),
            )),
            Some(Scripted::Expired) => Err(WafaqError::SessionExpired("404".to_string())),
            Some(Scripted::Fail(msg)) => Err(WafaqError::upstream(msg)),
            None => Ok(MessageResponse::with_intents(Vec::new())),
        }
    }
}

/// Build app state around a scripted assistant
pub fn test_state(assistant: Arc<ScriptedAssistant>, max_intents: usize) -> AppState {
    let diagnostics = Arc::new(DiagnosticLog::new());
    let sessions = Arc::new(SessionManager::new(assistant, "asst", Duration::from_secs(5)));
    let resolver = Arc::new(QueryResolver::new(
        sessions,
        diagnostics.clone(),
        FallbackPolicy::CountInWindow,
        Duration::from_secs(5),
    ));
    AppState::new(resolver, diagnostics, max_intents)
}

pub fn test_app(state: AppState) -> Router {
    create_router(state)
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

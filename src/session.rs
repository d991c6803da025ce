// src/session.rs
// Lazily created, shared assistant session

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::assistant::{AssistantApi, with_timeout};
use crate::error::Result;

/// An open conversational context on the remote assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Owns the single live session of the process.
///
/// The lock is held across session creation, so concurrent callers that find
/// no session wait for the first creator instead of each logging in.
pub struct SessionManager {
    api: Arc<dyn AssistantApi>,
    assistant_id: String,
    timeout: Duration,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AssistantApi>, assistant_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api,
            assistant_id: assistant_id.into(),
            timeout,
            current: Mutex::new(None),
        }
    }

    pub fn api(&self) -> &Arc<dyn AssistantApi> {
        &self.api
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// Return the held session, creating one if none is held
    pub async fn ensure_session(&self) -> Result<Session> {
        let mut current = self.current.lock().await;
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }

        debug!(assistant_id = %self.assistant_id, "No session held, logging in");
        let session_id = with_timeout(
            self.timeout,
            "create session",
            self.api.create_session(&self.assistant_id),
        )
        .await
        .map_err(|e| e.into_upstream())?;

        let session = Session {
            session_id,
            created_at: Utc::now(),
        };
        info!(session_id = %session.session_id, "New assistant session");
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drop `stale` if it is still the held session.
    ///
    /// Returns whether anything was discarded. A session created by another
    /// request after `stale` was handed out is left alone.
    pub async fn invalidate(&self, stale: &Session) -> bool {
        let mut current = self.current.lock().await;
        if current.as_ref() == Some(stale) {
            debug!(session_id = %stale.session_id, "Invalidating session");
            *current = None;
            true
        } else {
            false
        }
    }

    /// Drop whatever session is held
    pub async fn invalidate_all(&self) {
        self.current.lock().await.take();
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.lock().await.clone()
    }
}

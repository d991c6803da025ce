// src/assistant/watson.rs
// Watson Assistant V2 client with IAM API-key authentication

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::MessageRequest;
use super::{AssistantApi, MessageInput, MessageResponse};
use crate::config::AssistantSettings;
use crate::error::{Result, WafaqError};

/// Refresh cached tokens this long before they actually expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on how long a token is trusted, whatever IAM claims
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

#[derive(Debug, Clone)]
struct IamToken {
    access_token: String,
    expires_at: Instant,
}

impl IamToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SessionResponse {
    session_id: String,
}

pub struct WatsonClient {
    http: Client,
    settings: AssistantSettings,
    token: RwLock<Option<IamToken>>,
}

impl WatsonClient {
    pub fn new(http: Client, settings: AssistantSettings) -> Self {
        Self {
            http,
            settings,
            token: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    /// Exchange the API key for a fresh bearer token and cache it
    async fn login(&self) -> Result<String> {
        debug!(iam_url = %self.settings.iam_url, "Requesting IAM token");

        let response = self
            .http
            .post(&self.settings.iam_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", IAM_GRANT_TYPE),
                ("apikey", self.settings.api_key.as_str()),
            ])
            .send()
            .await?;
        let response = error_for_status(response, "IAM token request").await?;
        let body: IamTokenResponse = response.json().await?;

        let lifetime = Duration::from_secs(body.expires_in).min(MAX_TOKEN_LIFETIME);
        let expires_at = Instant::now()
            .checked_add(lifetime)
            .ok_or_else(|| WafaqError::upstream("IAM token expiry out of range"))?;
        let token = IamToken {
            access_token: body.access_token,
            expires_at,
        };
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(token);
        Ok(access_token)
    }

    /// Cached bearer token, refreshed when close to expiry
    async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }
        self.login().await
    }

    fn sessions_url(&self, assistant_id: &str) -> String {
        format!(
            "{}/v2/assistants/{}/sessions",
            self.settings.service_url.trim_end_matches('/'),
            urlencoding::encode(assistant_id)
        )
    }

    fn message_url(&self, assistant_id: &str, session_id: &str) -> String {
        format!(
            "{}/{}/message",
            self.sessions_url(assistant_id),
            urlencoding::encode(session_id)
        )
    }
}

#[async_trait]
impl AssistantApi for WatsonClient {
    async fn create_session(&self, assistant_id: &str) -> Result<String> {
        // A new session always starts from a fresh login.
        let token = self.login().await?;

        let response = self
            .http
            .post(self.sessions_url(assistant_id))
            .query(&[("version", self.settings.api_version.as_str())])
            .bearer_auth(token)
            .send()
            .await?;
        let response = error_for_status(response, "create session").await?;
        let session: SessionResponse = response.json().await?;

        info!(session_id = %session.session_id, "Assistant session created");
        Ok(session.session_id)
    }

    async fn send_message(
        &self,
        assistant_id: &str,
        session_id: &str,
        input: &MessageInput,
    ) -> Result<MessageResponse> {
        let token = self.bearer().await?;

        let response = self
            .http
            .post(self.message_url(assistant_id, session_id))
            .query(&[("version", self.settings.api_version.as_str())])
            .bearer_auth(token)
            .json(&MessageRequest { input })
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(WafaqError::SessionExpired(format!(
                "session {session_id} not found: {body}"
            )));
        }

        let response = error_for_status(response, "send message").await?;
        Ok(response.json().await?)
    }
}

async fn error_for_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(WafaqError::upstream(format!(
        "{operation} failed: assistant API error {status}: {body}"
    )))
}

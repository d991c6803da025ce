// src/assistant/mod.rs
// Remote assistant abstraction layer

mod types;
mod watson;

pub use types::{
    GenericResponse, IntentCandidate, MessageInput, MessageOptions, MessageOutput,
    MessageResponse,
};
pub use watson::WatsonClient;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, WafaqError};

/// Capability offered by the remote assistant service.
///
/// `send_message` must report an unknown or expired session as
/// [`WafaqError::SessionExpired`]; every other failure is an ordinary error.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Authenticate and open a new session, returning its id
    async fn create_session(&self, assistant_id: &str) -> Result<String>;

    /// Send one turn within an existing session
    async fn send_message(
        &self,
        assistant_id: &str,
        session_id: &str,
        input: &MessageInput,
    ) -> Result<MessageResponse>;
}

/// Bound a remote call; expiry becomes an upstream error
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(WafaqError::upstream(format!(
            "{operation} timed out after {limit:?}"
        ))),
    }
}

// src/resolver.rs
// Query resolution: ranked intents -> filtered window -> display texts

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::assistant::{IntentCandidate, MessageInput, MessageResponse, with_timeout};
use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, WafaqError};
use crate::session::{Session, SessionManager};

/// Intents with this prefix mean "no confident match" and are never shown
pub const FALLBACK_PREFIX: &str = "fallback";

/// Suggestion text when the lookup call itself failed
pub const LOOKUP_FAILED_TEXT: &str = "Error: assistant did not return text for intent";

/// Suggestion text when the assistant answered without any text
pub const NO_TEXT_TEXT: &str = "Error: assistant response has no generic text";

/// How fallback intents interact with the `max_intents` window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Fallback intents occupy a window slot even though they are dropped,
    /// so a window may yield fewer than `max_intents` suggestions.
    #[default]
    CountInWindow,
    /// Only non-fallback intents are counted: up to `max_intents` suggestions.
    CountMatchesOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSuggestion {
    pub intent: String,
    pub text: String,
    pub confidence: f64,
}

pub fn is_fallback(intent: &str) -> bool {
    intent.starts_with(FALLBACK_PREFIX)
}

/// Walk the ranked list in upstream order and keep what the window allows.
///
/// The counter starts at 1 for the first ranked position and the walk stops
/// once it exceeds `max_intents`. Fallback intents are never returned.
pub fn select_candidates(
    ranked: &[IntentCandidate],
    max_intents: usize,
    policy: FallbackPolicy,
) -> Vec<IntentCandidate> {
    let mut selected = Vec::new();
    let mut count = 0;

    for candidate in ranked {
        let fallback = is_fallback(&candidate.intent);
        if policy == FallbackPolicy::CountMatchesOnly && fallback {
            continue;
        }
        count += 1;
        if count > max_intents {
            break;
        }
        if fallback {
            continue;
        }
        selected.push(candidate.clone());
    }

    selected
}

/// Retry state of one resolution. Success and failure leave the loop.
enum Attempt {
    Authenticating { retried: bool },
    Sending { session: Session, retried: bool },
}

pub struct QueryResolver {
    sessions: Arc<SessionManager>,
    log: Arc<DiagnosticLog>,
    policy: FallbackPolicy,
    timeout: Duration,
}

impl QueryResolver {
    pub fn new(
        sessions: Arc<SessionManager>,
        log: Arc<DiagnosticLog>,
        policy: FallbackPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            log,
            policy,
            timeout,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Resolve free text into at most `max_intents` displayable suggestions
    pub async fn resolve(
        &self,
        query: &str,
        max_intents: usize,
    ) -> Result<Vec<ResolvedSuggestion>> {
        if query.is_empty() {
            self.log.error("Query: empty query parameter");
            return Err(WafaqError::invalid_input("Empty 'query' parameter"));
        }

        let (session, ranked) = self.fetch_ranked_intents(query).await?;

        let mut suggestions = Vec::new();
        for candidate in select_candidates(&ranked, max_intents, self.policy) {
            self.log.info(format!("Query: intent {}", candidate.intent));
            let text = self
                .fetch_intent_display_text(&session, &candidate.intent)
                .await;
            suggestions.push(ResolvedSuggestion {
                intent: candidate.intent,
                text,
                confidence: candidate.confidence,
            });
        }

        Ok(suggestions)
    }

    /// Classify `query`, recovering once from an expired session
    async fn fetch_ranked_intents(&self, query: &str) -> Result<(Session, Vec<IntentCandidate>)> {
        let input = MessageInput::query(query);
        let mut attempt = Attempt::Authenticating { retried: false };

        let (session, response) = loop {
            attempt = match attempt {
                Attempt::Authenticating { retried } => {
                    let session = self.sessions.ensure_session().await.inspect_err(|e| {
                        self.log.error(format!("Query: assistant login failed: {e}"));
                    })?;
                    Attempt::Sending { session, retried }
                }
                Attempt::Sending { session, retried } => {
                    match self.send(&session, &input).await {
                        Ok(response) => break (session, response),
                        Err(err) if err.is_session_expired() && !retried => {
                            self.log.debug(format!(
                                "Query: session {} expired, logging in again",
                                session.session_id
                            ));
                            self.sessions.invalidate(&session).await;
                            Attempt::Authenticating { retried: true }
                        }
                        Err(err) => {
                            // Next request starts from a fresh login.
                            self.sessions.invalidate(&session).await;
                            let err = err.into_upstream();
                            self.log.error(format!("Query: {err}"));
                            return Err(err);
                        }
                    }
                }
            };
        };

        match response.output.intents {
            Some(intents) => Ok((session, intents)),
            None => {
                self.log.error("Query: assistant responded without intents");
                Err(WafaqError::upstream("Assistant responded without intents"))
            }
        }
    }

    /// Canned answer text for one intent, asked out of conversational context.
    ///
    /// Failures degrade to a marker string; they never fail the resolution.
    pub async fn fetch_intent_display_text(&self, session: &Session, intent: &str) -> String {
        match self.send(session, &MessageInput::forced_intent(intent)).await {
            Ok(response) => match response.first_text() {
                Some(text) => text.to_string(),
                None => {
                    self.log
                        .error(format!("Intent text: response for '{intent}' has no generic text"));
                    NO_TEXT_TEXT.to_string()
                }
            },
            Err(err) => {
                self.log
                    .error(format!("Intent text: no text for '{intent}': {err}"));
                LOOKUP_FAILED_TEXT.to_string()
            }
        }
    }

    async fn send(&self, session: &Session, input: &MessageInput) -> Result<MessageResponse> {
        with_timeout(
            self.timeout,
            "send message",
            self.sessions.api().send_message(
                self.sessions.assistant_id(),
                &session.session_id,
                input,
            ),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::fake::{FakeAssistant, Reply};

    fn ranked(items: &[(&str, f64)]) -> Vec<IntentCandidate> {
        items
            .iter()
            .map(|(name, conf)| IntentCandidate::new(*name, *conf))
            .collect()
    }

    fn names(selected: &[IntentCandidate]) -> Vec<&str> {
        selected.iter().map(|c| c.intent.as_str()).collect()
    }

    fn resolver(fake: Arc<FakeAssistant>) -> (QueryResolver, Arc<DiagnosticLog>) {
        resolver_with(fake, FallbackPolicy::CountInWindow, Duration::from_secs(5))
    }

    fn resolver_with(
        fake: Arc<FakeAssistant>,
        policy: FallbackPolicy,
        timeout: Duration,
    ) -> (QueryResolver, Arc<DiagnosticLog>) {
        let log = Arc::new(DiagnosticLog::new());
        let sessions = Arc::new(SessionManager::new(fake, "asst", timeout));
        (QueryResolver::new(sessions, log.clone(), policy, timeout), log)
    }

    // ========================================================================
    // Window selection
    // ========================================================================

    #[test]
    fn test_fallback_consumes_window_slot() {
        let list = ranked(&[("fallback_intent", 0.9), ("refund", 0.8), ("billing", 0.6)]);
        let selected = select_candidates(&list, 2, FallbackPolicy::CountInWindow);
        assert_eq!(names(&selected), vec!["refund"]);
    }

    #[test]
    fn test_count_matches_only_fills_window() {
        let list = ranked(&[("fallback_intent", 0.9), ("refund", 0.8), ("billing", 0.6)]);
        let selected = select_candidates(&list, 2, FallbackPolicy::CountMatchesOnly);
        assert_eq!(names(&selected), vec!["refund", "billing"]);
    }

    #[test]
    fn test_window_truncates_in_upstream_order() {
        let list = ranked(&[("a", 0.2), ("b", 0.9), ("c", 0.5), ("d", 0.1)]);
        let selected = select_candidates(&list, 3, FallbackPolicy::CountInWindow);
        assert_eq!(names(&selected), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fallback_prefix_is_case_sensitive() {
        let list = ranked(&[("Fallback_x", 0.9), ("fallback", 0.8), ("fallbacks_more", 0.7)]);
        let selected = select_candidates(&list, 5, FallbackPolicy::CountInWindow);
        assert_eq!(names(&selected), vec!["Fallback_x"]);
    }

    #[test]
    fn test_zero_window_is_empty() {
        let list = ranked(&[("a", 0.9)]);
        assert!(select_candidates(&list, 0, FallbackPolicy::CountInWindow).is_empty());
        assert!(select_candidates(&list, 0, FallbackPolicy::CountMatchesOnly).is_empty());
    }

    #[test]
    fn test_window_bounds_hold_for_many_shapes() {
        let pool = ["fallback_a", "x", "fallback_b", "y", "z", "fallback_c", "w"];
        for len in 0..=pool.len() {
            let list: Vec<_> = pool[..len]
                .iter()
                .map(|n| IntentCandidate::new(*n, 0.5))
                .collect();
            for max in 0..=8 {
                for policy in [FallbackPolicy::CountInWindow, FallbackPolicy::CountMatchesOnly] {
                    let selected = select_candidates(&list, max, policy);
                    assert!(selected.len() <= max);
                    assert!(selected.iter().all(|c| !is_fallback(&c.intent)));
                }
            }
        }
    }

    // ========================================================================
    // Resolution and retry
    // ========================================================================

    #[tokio::test]
    async fn test_refund_policy_scenario() {
        let fake = Arc::new(
            FakeAssistant::new()
                .reply_to_query(Reply::Ok(MessageResponse::with_intents(ranked(&[
                    ("fallback_intent", 0.9),
                    ("refund", 0.8),
                    ("billing", 0.6),
                ]))))
                .reply_to_intent("refund", Reply::Ok(MessageResponse::with_text("Refunds take 5 days."))),
        );
        let (resolver, _) = resolver(fake.clone());

        let suggestions = resolver.resolve("refund policy", 2).await.unwrap();
        assert_eq!(
            suggestions,
            vec![ResolvedSuggestion {
                intent: "refund".to_string(),
                text: "Refunds take 5 days.".to_string(),
                confidence: 0.8,
            }]
        );
        assert_eq!(fake.created(), 1);
        assert_eq!(fake.sent(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid_input() {
        let fake = Arc::new(FakeAssistant::new());
        let (resolver, _) = resolver(fake.clone());

        let err = resolver.resolve("", 5).await.unwrap_err();
        assert!(matches!(err, WafaqError::InvalidInput(_)));
        assert_eq!(fake.created(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_retries_once_with_new_session() {
        let fake = Arc::new(
            FakeAssistant::new()
                .reply_to_query(Reply::Ok(MessageResponse::with_intents(Vec::new())))
                .reply_to_query(Reply::Expired)
                .reply_to_query(Reply::Ok(MessageResponse::with_intents(ranked(&[("refund", 0.8)])))),
        );
        let (resolver, _) = resolver(fake.clone());

        // Warm up a session, then let it expire on the next query.
        resolver.resolve("hello", 5).await.unwrap();
        let before = resolver.sessions().current().await.unwrap();

        let suggestions = resolver.resolve("refund policy", 5).await.unwrap();
        let after = resolver.sessions().current().await.unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(fake.created(), 2);
        assert_eq!(fake.sent(), 3);
        assert_ne!(before.session_id, after.session_id);
    }

    #[tokio::test]
    async fn test_second_expiry_is_upstream_error() {
        let fake = Arc::new(
            FakeAssistant::new()
                .reply_to_query(Reply::Expired)
                .reply_to_query(Reply::Expired),
        );
        let (resolver, _) = resolver(fake.clone());

        let err = resolver.resolve("refund policy", 5).await.unwrap_err();
        assert!(matches!(err, WafaqError::Upstream(_)));
        assert_eq!(fake.sent(), 2);
        assert_eq!(fake.created(), 2);
    }

    #[tokio::test]
    async fn test_other_failure_does_not_retry() {
        let fake = Arc::new(FakeAssistant::new().reply_to_query(Reply::Fail("500 Internal Server Error")));
        let (resolver, log) = resolver(fake.clone());

        let err = resolver.resolve("refund policy", 5).await.unwrap_err();
        assert!(matches!(err, WafaqError::Upstream(_)));
        assert!(err.to_string().contains("500"));
        assert_eq!(fake.sent(), 1);
        assert_eq!(fake.created(), 1);
        // The session is dropped so the next request logs in again.
        assert!(resolver.sessions().current().await.is_none());
        assert!(log.entries().iter().any(|e| e.message.contains("500")));
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_as_upstream() {
        let fake = Arc::new(FakeAssistant::new().failing_create());
        let (resolver, _) = resolver(fake.clone());

        let err = resolver.resolve("refund policy", 5).await.unwrap_err();
        assert!(matches!(err, WafaqError::Upstream(_)));
        assert_eq!(fake.sent(), 0);
    }

    #[tokio::test]
    async fn test_missing_intents_is_upstream_error() {
        let fake = Arc::new(FakeAssistant::new().reply_to_query(Reply::Ok(MessageResponse::default())));
        let (resolver, _) = resolver(fake);

        let err = resolver.resolve("refund policy", 5).await.unwrap_err();
        assert!(err.to_string().contains("without intents"));
    }

    #[tokio::test]
    async fn test_all_fallback_yields_empty() {
        let fake = Arc::new(FakeAssistant::new().reply_to_query(Reply::Ok(
            MessageResponse::with_intents(ranked(&[("fallback", 0.9), ("fallback_other", 0.4)])),
        )));
        let (resolver, _) = resolver(fake);

        assert!(resolver.resolve("???", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_lookup_failure_degrades_one_suggestion() {
        let fake = Arc::new(
            FakeAssistant::new()
                .reply_to_query(Reply::Ok(MessageResponse::with_intents(ranked(&[
                    ("refund", 0.8),
                    ("billing", 0.6),
                    ("shipping", 0.3),
                ]))))
                .reply_to_intent("billing", Reply::Fail("503 Service Unavailable"))
                .reply_to_intent("shipping", Reply::Ok(MessageResponse::default())),
        );
        let (resolver, log) = resolver(fake);

        let suggestions = resolver.resolve("money", 5).await.unwrap();
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].text, "answer for refund");
        assert_eq!(suggestions[1].text, LOOKUP_FAILED_TEXT);
        assert_eq!(suggestions[2].text, NO_TEXT_TEXT);
        assert_eq!(suggestions[1].confidence, 0.6);
        assert!(log.entries().iter().any(|e| e.message.contains("billing")));
    }

    #[tokio::test]
    async fn test_text_lookup_expiry_is_not_retried() {
        let fake = Arc::new(
            FakeAssistant::new()
                .reply_to_query(Reply::Ok(MessageResponse::with_intents(ranked(&[("refund", 0.8)]))))
                .reply_to_intent("refund", Reply::Expired),
        );
        let (resolver, _) = resolver(fake.clone());

        let suggestions = resolver.resolve("refund policy", 5).await.unwrap();
        assert_eq!(suggestions[0].text, LOOKUP_FAILED_TEXT);
        assert_eq!(fake.created(), 1);
    }

    #[tokio::test]
    async fn test_hanging_query_times_out_as_upstream() {
        let fake = Arc::new(FakeAssistant::new().reply_to_query(Reply::Hang));
        let (resolver, _) =
            resolver_with(fake.clone(), FallbackPolicy::CountInWindow, Duration::from_millis(50));

        let err = resolver.resolve("refund policy", 5).await.unwrap_err();
        assert!(matches!(err, WafaqError::Upstream(_)));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(fake.sent(), 1);
    }

    #[tokio::test]
    async fn test_text_lookups_reuse_query_session() {
        let fake = Arc::new(FakeAssistant::new().reply_to_query(Reply::Ok(
            MessageResponse::with_intents(ranked(&[("a", 0.5), ("b", 0.4)])),
        )));
        let (resolver, _) = resolver(fake.clone());

        resolver.resolve("q", 5).await.unwrap();
        let seen = fake.seen_sessions.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|s| s == "session-1"));
    }
}

// src/assistant/types.rs
// Wire types for the assistant message API

use serde::{Deserialize, Serialize};

/// A ranked intent as returned by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentCandidate {
    pub intent: String,
    pub confidence: f64,
}

impl IntentCandidate {
    pub fn new(intent: impl Into<String>, confidence: f64) -> Self {
        Self {
            intent: intent.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageOptions {
    pub alternate_intents: bool,
}

/// The `input` object of a message request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageInput {
    pub message_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<MessageOptions>,
    /// Intents forced onto the turn, bypassing classification
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<IntentCandidate>,
}

impl MessageInput {
    /// Classify free text and ask for the full ranked list
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            message_type: "text".to_string(),
            text: text.into(),
            options: Some(MessageOptions {
                alternate_intents: true,
            }),
            intents: Vec::new(),
        }
    }

    /// Ask for the canned answer of one intent, out of conversational context
    pub fn forced_intent(intent: impl Into<String>) -> Self {
        Self {
            message_type: "text".to_string(),
            text: "*".to_string(),
            options: None,
            intents: vec![IntentCandidate::new(intent, 1.0)],
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageRequest<'a> {
    pub input: &'a MessageInput,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenericResponse {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageOutput {
    /// Absent when the assistant could not classify the turn at all
    #[serde(default)]
    pub intents: Option<Vec<IntentCandidate>>,
    #[serde(default)]
    pub generic: Vec<GenericResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub output: MessageOutput,
}

impl MessageResponse {
    pub fn with_intents(intents: Vec<IntentCandidate>) -> Self {
        Self {
            output: MessageOutput {
                intents: Some(intents),
                generic: Vec::new(),
            },
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            output: MessageOutput {
                intents: None,
                generic: vec![GenericResponse {
                    response_type: Some("text".to_string()),
                    text: Some(text.into()),
                }],
            },
        }
    }

    /// First generic entry that carries text
    pub fn first_text(&self) -> Option<&str> {
        self.output
            .generic
            .iter()
            .find_map(|g| g.text.as_deref())
    }
}

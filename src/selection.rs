// src/selection.rs
// Records which suggestion the user actually picked

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{Result, WafaqError};
use crate::utils::{escape_html, format_timestamp, push_row, table_open};

/// Recorded when the caller does not say which intent was ranked first
pub const DEFAULT_TOP_CONFIDENCE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionRecord {
    pub timestamp: DateTime<Local>,
    pub query: String,
    pub selected_intent: String,
    pub selected_confidence: f64,
    pub top_intent: String,
    pub top_confidence: f64,
}

/// One selection as submitted; `None` means the field was not supplied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionInput {
    pub query: Option<String>,
    pub selected_intent: Option<String>,
    pub selected_confidence: Option<f64>,
    pub top_intent: Option<String>,
    pub top_confidence: Option<f64>,
}

impl SelectionInput {
    pub fn new(query: impl Into<String>, selected_intent: impl Into<String>, selected_confidence: f64) -> Self {
        Self {
            query: Some(query.into()),
            selected_intent: Some(selected_intent.into()),
            selected_confidence: Some(selected_confidence),
            top_intent: None,
            top_confidence: None,
        }
    }

    pub fn with_top(mut self, top_intent: impl Into<String>, top_confidence: f64) -> Self {
        self.top_intent = Some(top_intent.into());
        self.top_confidence = Some(top_confidence);
        self
    }
}

/// Append-only selection log kept for the life of the process
#[derive(Debug, Default)]
pub struct SelectionRecorder {
    records: Mutex<Vec<SelectionRecord>>,
}

impl SelectionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a selection. Only missing required fields are rejected;
    /// confidences are stored as given.
    pub fn record(&self, input: SelectionInput) -> Result<()> {
        let query = input.query.ok_or_else(|| missing("query"))?;
        let selected_intent = input.selected_intent.ok_or_else(|| missing("selected_name"))?;
        let selected_confidence = input
            .selected_confidence
            .ok_or_else(|| missing("selected_confidence"))?;

        let record = SelectionRecord {
            timestamp: Local::now(),
            query,
            selected_intent,
            selected_confidence,
            top_intent: input.top_intent.unwrap_or_default(),
            top_confidence: input.top_confidence.unwrap_or(DEFAULT_TOP_CONFIDENCE),
        };
        debug!(
            query = %record.query,
            selected = %record.selected_intent,
            confidence = record.selected_confidence,
            "Selection recorded"
        );

        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
        Ok(())
    }

    /// Snapshot of every record in insertion order
    pub fn export_as_table(&self) -> Vec<SelectionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn render_html(&self) -> String {
        let mut html = table_open(&[
            "Time",
            "Query",
            "Selected FAQ",
            "Selected Conf",
            "Top FAQ",
            "Top Conf",
        ]);
        for record in self.export_as_table() {
            push_row(
                &mut html,
                &[
                    format_timestamp(&record.timestamp),
                    escape_html(&record.query),
                    escape_html(&record.selected_intent),
                    record.selected_confidence.to_string(),
                    escape_html(&record.top_intent),
                    record.top_confidence.to_string(),
                ],
            );
        }
        html.push_str("</table>");
        html
    }
}

fn missing(field: &str) -> WafaqError {
    WafaqError::invalid_input(format!("Missing '{field}' parameter"))
}

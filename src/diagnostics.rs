// src/diagnostics.rs
// In-memory event trail served at GET /log

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

use crate::utils::{escape_html, format_timestamp, push_row, table_open};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
    pub indent: u8,
}

/// Append-only diagnostic log.
///
/// Every entry is also emitted through `tracing`, so the page and the
/// process log tell the same story.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.push(LogLevel::Debug, message.into(), 0);
    }

    /// Info entries sit one level deeper than debug/error in the rendered page
    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into(), 1);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into(), 0);
    }

    fn push(&self, level: LogLevel, message: String, indent: u8) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }

        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message,
            indent,
        };
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn render_html(&self) -> String {
        let mut html = table_open(&["Time", "Type", "Message"]);
        for entry in self.entries() {
            let message = format!(
                "{}{}",
                "&nbsp;&nbsp;".repeat(entry.indent as usize),
                escape_html(&entry.message)
            );
            push_row(
                &mut html,
                &[format_timestamp(&entry.timestamp), entry.level.to_string(), message],
            );
        }
        html.push_str("</table>");
        html
    }
}

// src/utils.rs
// HTML helpers shared by the log pages

use chrono::{DateTime, Local};

// ============================================================================
// Timestamp utilities
// ============================================================================

/// Display format for log timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

// ============================================================================
// HTML utilities
// ============================================================================

/// Escape text for inclusion in HTML element content
pub fn escape_html(raw: &str) -> String {
    html_escape::encode_text(raw).into_owned()
}

/// Open a bordered table with the given header cells
pub fn table_open(headers: &[&str]) -> String {
    let mut html = String::from(r#"<table style="border: 1px solid #ddd;"><tr>"#);
    for header in headers {
        html.push_str("<th>");
        html.push_str(header);
        html.push_str("</th>");
    }
    html.push_str("</tr>");
    html
}

/// Append one row of already-escaped cells
pub fn push_row(html: &mut String, cells: &[String]) {
    html.push_str("<tr>");
    for cell in cells {
        html.push_str("<td>");
        html.push_str(cell);
        html.push_str("</td>");
    }
    html.push_str("</tr>");
}

/// Wrap a fragment in the bare page shell served by the log endpoints
pub fn html_page(fragment: &str) -> String {
    format!("<HTML><BODY>{fragment}</BODY></HTML>")
}

//! Stored data model: captured records and per-tab metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel stored in place of a response body that could not be retrieved
/// (cross-origin restriction, detached target, and similar).
pub const BODY_UNAVAILABLE: &str = "[response body not accessible]";

/// A normalized request/response exchange. Immutable once created; destroyed
/// only by log eviction or an explicit clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display identifier derived from url, request header count and capture
    /// time. Best-effort unique; log position is the stable key.
    pub id: String,

    pub url: String,
    pub method: String,
    pub status_code: u16,
    pub status_text: String,

    /// Header name to value, case as received. A repeated name keeps the
    /// last value seen.
    pub request_headers: BTreeMap<String, String>,
    pub response_headers: BTreeMap<String, String>,

    /// Raw response body text, or [`BODY_UNAVAILABLE`].
    pub response_body: String,

    /// Parsed body cache. `None` means "not structured" or "parse failed",
    /// which is not an error. Only trusted when re-derivable from
    /// `response_body` and `content_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body_parsed: Option<serde_json::Value>,

    /// Declared MIME type; may be empty.
    pub content_type: String,

    /// Record creation time, not wire time.
    pub timestamp: DateTime<Utc>,

    /// Sum of the reported header and body sizes. A payload-size
    /// approximation, not an elapsed-time measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// True wire timing, when the event source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Metadata tracked per inspected tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub tab_id: i64,
    pub url: String,
    pub title: String,

    /// Refreshed on every interaction; tabs idle past the retention window
    /// are eligible for cleanup.
    pub last_active: DateTime<Utc>,
}

/// Current top-level url/title of an inspected page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

impl PageInfo {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Build the display id for a record.
pub fn record_id(url: &str, header_count: usize, captured_at: DateTime<Utc>) -> String {
    format!("{}-{}-{}", url, header_count, captured_at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_embeds_url_and_header_count() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let id = record_id("https://x/api", 4, at);
        assert_eq!(id, "https://x/api-4-1700000000123");
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = Record {
            id: "a-0-1".into(),
            url: "https://x/api".into(),
            method: "GET".into(),
            status_code: 200,
            status_text: "OK".into(),
            request_headers: BTreeMap::new(),
            response_headers: BTreeMap::new(),
            response_body: "{}".into(),
            response_body_parsed: Some(serde_json::json!({})),
            content_type: "application/json".into(),
            timestamp: Utc::now(),
            duration: Some(128),
            elapsed_ms: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let decoded: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}

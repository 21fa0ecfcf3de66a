//! Raw network event source interface
//!
//! The host environment (an archive reader, a live debugger attachment)
//! delivers finished exchanges and navigation events through these types.
//! The engine never talks to the wire itself.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Request half of a finished exchange, as delivered by the source.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub url: String,
    pub method: String,
    /// Ordered as received; duplicates allowed.
    pub headers: Vec<(String, String)>,
}

/// Response half of a finished exchange. Absent while still in flight.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Reported sizes; `None` when the source does not know them.
    pub headers_size: Option<i64>,
    pub body_size: Option<i64>,
}

impl RawResponse {
    /// First header matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Why a response body could not be produced.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct BodyUnavailable {
    pub reason: String,
}

impl BodyUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Deferred body retrieval capability offered by the event source.
#[async_trait]
pub trait FetchBody: Send + Sync {
    async fn fetch(&self) -> Result<String, BodyUnavailable>;
}

/// How the response body reaches the normalizer.
#[derive(Clone)]
pub enum ResponseBody {
    /// The source handed the text over with the event.
    Inline(String),
    /// The source exposes an async fetch; it may fail.
    Deferred(Arc<dyn FetchBody>),
    /// The source already knows the body cannot be read.
    Unavailable,
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(text) => f.debug_tuple("Inline").field(&text.len()).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// One finished network exchange as observed by the source.
#[derive(Debug, Clone)]
pub struct RawExchange {
    pub request: RawRequest,
    pub response: Option<RawResponse>,
    pub body: ResponseBody,
    /// Wall-clock duration of the exchange, when the source measures it.
    pub elapsed_ms: Option<u64>,
}

/// Event stream consumed by a capture session.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    RequestFinished(RawExchange),
    /// The inspected page navigated to a new top-level URL.
    Navigated { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = RawResponse {
            status: 200,
            status_text: "OK".into(),
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                ("X-Req".into(), "1".into()),
            ],
            headers_size: None,
            body_size: None,
        };

        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.header("missing"), None);
    }
}

//! HTTP Archive (HAR) ingestion
//!
//! Maps archive entries onto capture events so recorded browser traffic can
//! be replayed through the pipeline. Only the fields the normalizer consumes
//! are modelled; everything else in the archive is ignored.

use crate::event::{CaptureEvent, RawExchange, RawRequest, RawResponse, ResponseBody};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarError {
    #[error("unreadable archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed archive: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Har {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    #[serde(default)]
    pages: Vec<HarPage>,
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarPage {
    // exporters commonly store the page URL here
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
    response: HarResponse,
    #[serde(default)]
    time: f64,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarResponse {
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    #[serde(default = "unknown_size")]
    headers_size: i64,
    #[serde(default = "unknown_size")]
    body_size: i64,
    #[serde(default)]
    content: HarContent,
}

// the HAR convention for "not measured"
fn unknown_size() -> i64 {
    -1
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

/// Parse archive JSON into a capture event stream: one navigation event per
/// recorded page, then one finished exchange per entry.
pub fn parse_har(json: &str) -> Result<Vec<CaptureEvent>, HarError> {
    let har: Har = serde_json::from_str(json)?;
    let mut events = Vec::with_capacity(har.log.pages.len() + har.log.entries.len());

    for page in &har.log.pages {
        if page.title.starts_with("http") {
            events.push(CaptureEvent::Navigated {
                url: page.title.clone(),
            });
        }
    }

    for entry in har.log.entries {
        events.push(CaptureEvent::RequestFinished(entry_to_exchange(entry)));
    }

    Ok(events)
}

pub fn read_har_file(path: &Path) -> Result<Vec<CaptureEvent>, HarError> {
    let content = std::fs::read_to_string(path)?;
    parse_har(&content)
}

fn entry_to_exchange(entry: HarEntry) -> RawExchange {
    // status 0 marks an aborted exchange with no response phase
    let response = (entry.response.status != 0).then(|| RawResponse {
        status: entry.response.status,
        status_text: entry.response.status_text.clone(),
        headers: header_pairs(&entry.response.headers),
        headers_size: size_or_unknown(entry.response.headers_size),
        body_size: size_or_unknown(entry.response.body_size),
    });

    let body = match entry.response.content.text {
        Some(text) => ResponseBody::Inline(text),
        None => ResponseBody::Unavailable,
    };

    RawExchange {
        request: RawRequest {
            url: entry.request.url,
            method: entry.request.method,
            headers: header_pairs(&entry.request.headers),
        },
        response,
        body,
        elapsed_ms: (entry.time > 0.0).then(|| entry.time.round() as u64),
    }
}

fn header_pairs(headers: &[HarHeader]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect()
}

fn size_or_unknown(size: i64) -> Option<i64> {
    (size >= 0).then_some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "log": {
            "version": "1.2",
            "pages": [
                {"id": "page_1", "title": "https://site.test/home"}
            ],
            "entries": [
                {
                    "request": {
                        "method": "GET",
                        "url": "https://site.test/api/items",
                        "headers": [{"name": "Accept", "value": "application/json"}]
                    },
                    "response": {
                        "status": 200,
                        "statusText": "OK",
                        "headers": [{"name": "Content-Type", "value": "application/json"}],
                        "headersSize": 120,
                        "bodySize": 7,
                        "content": {"mimeType": "application/json", "text": "{\"a\":1}"}
                    },
                    "time": 12.6
                },
                {
                    "request": {"method": "GET", "url": "https://site.test/aborted", "headers": []},
                    "response": {"status": 0, "statusText": "", "headers": [], "content": {}}
                }
            ]
        }
    }"#;

    #[test]
    fn parses_pages_and_entries() {
        let events = parse_har(SAMPLE).unwrap();
        assert_eq!(events.len(), 3);

        match &events[0] {
            CaptureEvent::Navigated { url } => assert_eq!(url, "https://site.test/home"),
            other => panic!("expected navigation, got {:?}", other),
        }

        match &events[1] {
            CaptureEvent::RequestFinished(exchange) => {
                assert_eq!(exchange.request.url, "https://site.test/api/items");
                let response = exchange.response.as_ref().unwrap();
                assert_eq!(response.status, 200);
                assert_eq!(response.headers_size, Some(120));
                assert_eq!(exchange.elapsed_ms, Some(13));
                match &exchange.body {
                    ResponseBody::Inline(text) => assert_eq!(text, "{\"a\":1}"),
                    other => panic!("expected inline body, got {:?}", other),
                }
            }
            other => panic!("expected exchange, got {:?}", other),
        }
    }

    #[test]
    fn aborted_entries_have_no_response_phase() {
        let events = parse_har(SAMPLE).unwrap();
        match &events[2] {
            CaptureEvent::RequestFinished(exchange) => {
                assert!(exchange.response.is_none());
                assert!(matches!(exchange.body, ResponseBody::Unavailable));
            }
            other => panic!("expected exchange, got {:?}", other),
        }
    }

    #[test]
    fn malformed_archives_are_rejected() {
        assert!(matches!(parse_har("[]"), Err(HarError::Parse(_))));
        assert!(parse_har("{\"log\": {}}").is_ok());
    }
}

//! Record normalizer: raw exchange in, stored record out
//!
//! Every external step (body retrieval, JSON parse) is isolated so a failure
//! degrades one field instead of discarding the record.

use crate::event::{RawExchange, ResponseBody};
use crate::record::{record_id, Record, BODY_UNAVAILABLE};
use chrono::Utc;
use std::collections::BTreeMap;

/// Normalize a finished exchange. Returns `None` when the exchange has no
/// response phase yet.
pub async fn normalize(exchange: &RawExchange) -> Option<Record> {
    let response = exchange.response.as_ref()?;
    let captured_at = Utc::now();

    let response_body = match &exchange.body {
        ResponseBody::Inline(text) => text.clone(),
        ResponseBody::Deferred(fetch) => match fetch.fetch().await {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(url = %exchange.request.url, "response body unavailable: {}", err);
                BODY_UNAVAILABLE.to_string()
            }
        },
        ResponseBody::Unavailable => BODY_UNAVAILABLE.to_string(),
    };

    let content_type = response.content_type().unwrap_or("").to_string();

    let response_body_parsed = if content_type.contains("application/json")
        && !response_body.is_empty()
        && response_body != BODY_UNAVAILABLE
    {
        // parse failure is not an error; the record keeps the raw text
        serde_json::from_str::<serde_json::Value>(&response_body).ok()
    } else {
        None
    };

    Some(Record {
        id: record_id(&exchange.request.url, exchange.request.headers.len(), captured_at),
        url: exchange.request.url.clone(),
        method: exchange.request.method.clone(),
        status_code: response.status,
        status_text: response.status_text.clone(),
        request_headers: flatten_headers(&exchange.request.headers),
        response_headers: flatten_headers(&response.headers),
        response_body,
        response_body_parsed,
        content_type,
        timestamp: captured_at,
        duration: payload_size(response.headers_size, response.body_size),
        elapsed_ms: exchange.elapsed_ms,
    })
}

/// Flatten an ordered header list into a name-to-value map; a repeated name
/// keeps the last value seen.
fn flatten_headers(headers: &[(String, String)]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        map.insert(name.clone(), value.clone());
    }
    map
}

/// Sum of the known non-negative size fields; `None` when neither is known.
fn payload_size(headers_size: Option<i64>, body_size: Option<i64>) -> Option<i64> {
    let known: Vec<i64> = [headers_size, body_size]
        .into_iter()
        .flatten()
        .filter(|size| *size >= 0)
        .collect();
    if known.is_empty() {
        None
    } else {
        Some(known.into_iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BodyUnavailable, FetchBody, RawRequest, RawResponse};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct DeniedBody;

    #[async_trait]
    impl FetchBody for DeniedBody {
        async fn fetch(&self) -> Result<String, BodyUnavailable> {
            Err(BodyUnavailable::new("cross-origin"))
        }
    }

    fn json_exchange(body: &str) -> RawExchange {
        RawExchange {
            request: RawRequest {
                url: "https://x/api/items".into(),
                method: "GET".into(),
                headers: vec![
                    ("Accept".into(), "application/json".into()),
                    ("Accept".into(), "text/plain".into()),
                ],
            },
            response: Some(RawResponse {
                status: 200,
                status_text: "OK".into(),
                headers: vec![("Content-Type".into(), "application/json".into())],
                headers_size: Some(120),
                body_size: Some(7),
            }),
            body: ResponseBody::Inline(body.to_string()),
            elapsed_ms: Some(42),
        }
    }

    #[tokio::test]
    async fn in_flight_exchange_yields_nothing() {
        let mut exchange = json_exchange("{}");
        exchange.response = None;
        assert!(normalize(&exchange).await.is_none());
    }

    #[tokio::test]
    async fn well_formed_json_body_is_parsed() {
        let record = normalize(&json_exchange(r#"{"a":1}"#)).await.unwrap();
        assert_eq!(record.response_body, r#"{"a":1}"#);
        assert_eq!(record.response_body_parsed, Some(serde_json::json!({"a": 1})));
        assert_eq!(record.content_type, "application/json");
        assert_eq!(record.duration, Some(127));
        assert_eq!(record.elapsed_ms, Some(42));
    }

    #[tokio::test]
    async fn malformed_json_degrades_to_raw_text() {
        let record = normalize(&json_exchange("{not json")).await.unwrap();
        assert_eq!(record.response_body, "{not json");
        assert!(record.response_body_parsed.is_none());
    }

    #[tokio::test]
    async fn denied_body_fetch_substitutes_sentinel() {
        let mut exchange = json_exchange("");
        exchange.body = ResponseBody::Deferred(Arc::new(DeniedBody));
        let record = normalize(&exchange).await.unwrap();
        assert_eq!(record.response_body, BODY_UNAVAILABLE);
        assert!(record.response_body_parsed.is_none());
    }

    #[tokio::test]
    async fn duplicate_headers_keep_last_value() {
        let record = normalize(&json_exchange("{}")).await.unwrap();
        assert_eq!(
            record.request_headers.get("Accept").map(String::as_str),
            Some("text/plain")
        );
        assert_eq!(record.request_headers.len(), 1);
    }

    #[tokio::test]
    async fn unknown_sizes_leave_duration_unset() {
        let mut exchange = json_exchange("{}");
        if let Some(response) = exchange.response.as_mut() {
            response.headers_size = Some(-1);
            response.body_size = None;
        }
        let record = normalize(&exchange).await.unwrap();
        assert_eq!(record.duration, None);
    }

    #[tokio::test]
    async fn record_id_reflects_request_shape() {
        let record = normalize(&json_exchange("{}")).await.unwrap();
        assert!(record.id.starts_with("https://x/api/items-2-"));
    }
}

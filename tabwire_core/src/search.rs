//! Keyword filtering over a record set
//!
//! Pure and synchronous; callers re-run it against the full unfiltered set on
//! every keyword change.

use crate::record::Record;

/// Case-insensitive substring filter across URL, raw body and the serialized
/// parsed body. An empty or whitespace-only keyword returns every record in
/// its original order.
pub fn filter_records<'a>(records: &'a [Record], keyword: &str) -> Vec<&'a Record> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return records.iter().collect();
    }

    let needle = keyword.to_lowercase();
    records
        .iter()
        .filter(|record| matches_keyword(record, &needle))
        .collect()
}

fn matches_keyword(record: &Record, needle: &str) -> bool {
    if record.url.to_lowercase().contains(needle) {
        return true;
    }
    if record.response_body.to_lowercase().contains(needle) {
        return true;
    }
    if let Some(parsed) = &record.response_body_parsed {
        // serialization failure just means "no match on this field"
        if let Ok(serialized) = serde_json::to_string(parsed) {
            if serialized.to_lowercase().contains(needle) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record(url: &str, body: &str, parsed: Option<serde_json::Value>) -> Record {
        Record {
            id: format!("{}-0-0", url),
            url: url.into(),
            method: "GET".into(),
            status_code: 200,
            status_text: "OK".into(),
            request_headers: BTreeMap::new(),
            response_headers: BTreeMap::new(),
            response_body: body.into(),
            response_body_parsed: parsed,
            content_type: String::new(),
            timestamp: Utc::now(),
            duration: None,
            elapsed_ms: None,
        }
    }

    #[test]
    fn empty_keyword_returns_everything_in_order() {
        let records = vec![
            record("https://x/b", "", None),
            record("https://x/a", "", None),
        ];

        let filtered = filter_records(&records, "");
        assert_eq!(filtered.len(), 2);
        assert!(std::ptr::eq(filtered[0], &records[0]));
        assert!(std::ptr::eq(filtered[1], &records[1]));

        assert_eq!(filter_records(&records, "   ").len(), 2);
    }

    #[test]
    fn url_match_is_case_insensitive() {
        let records = vec![record("https://x/API/foo", "", None)];
        assert_eq!(filter_records(&records, "api").len(), 1);
        assert_eq!(filter_records(&records, "FOO").len(), 1);
        assert_eq!(filter_records(&records, "bar").len(), 0);
    }

    #[test]
    fn body_and_parsed_body_are_searched() {
        let records = vec![
            record("https://x/1", "plain TOKEN here", None),
            record(
                "https://x/2",
                "",
                Some(serde_json::json!({"nested": {"value": "Secret"}})),
            ),
        ];

        assert_eq!(filter_records(&records, "token").len(), 1);

        let by_parsed = filter_records(&records, "secret");
        assert_eq!(by_parsed.len(), 1);
        assert_eq!(by_parsed[0].url, "https://x/2");
    }
}

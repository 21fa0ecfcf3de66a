//! Response body presentation helpers

use crate::record::BODY_UNAVAILABLE;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedBody {
    pub formatted: String,
    pub is_json: bool,
    pub is_binary: bool,
}

impl FormattedBody {
    fn text(formatted: impl Into<String>) -> Self {
        Self {
            formatted: formatted.into(),
            is_json: false,
            is_binary: false,
        }
    }

    fn json(formatted: String) -> Self {
        Self {
            formatted,
            is_json: true,
            is_binary: false,
        }
    }
}

const BINARY_CONTENT_TYPES: &[&str] = &["image/", "video/", "audio/", "application/octet-stream"];

/// Render a body for display. Structured JSON pretty-prints with two-space
/// indentation; binary content types collapse to a placeholder; everything
/// else passes through as text.
pub fn format_body(body: &str, content_type: &str, parsed: Option<&Value>) -> FormattedBody {
    if body.is_empty() || body == BODY_UNAVAILABLE {
        return FormattedBody::text(body);
    }

    if let Some(value) = parsed {
        if value.is_object() || value.is_array() {
            if let Ok(formatted) = serde_json::to_string_pretty(value) {
                return FormattedBody::json(formatted);
            }
        }
    }

    if content_type.contains("application/json") {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if let Ok(formatted) = serde_json::to_string_pretty(&value) {
                return FormattedBody::json(formatted);
            }
        }
        // not valid JSON after all; fall through to text
    }

    if BINARY_CONTENT_TYPES.iter().any(|t| content_type.contains(t)) {
        return FormattedBody {
            formatted: format!("[Binary data: {}]", content_type),
            is_json: false,
            is_binary: true,
        };
    }

    FormattedBody::text(body)
}

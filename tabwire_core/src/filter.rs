//! Traffic classifier: keeps API-shaped exchanges, drops static assets

use crate::event::RawExchange;

const STATIC_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", // images
    ".css", // stylesheets
    ".woff", ".woff2", ".ttf", ".eot", // fonts
    ".mp4", ".webm", ".mp3", ".wav", // media
    ".pdf", // documents
];

const API_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "text/xml",
    "text/html",
    "application/javascript",
    "text/plain",
];

/// Whether an exchange looks like API traffic worth recording. Total and
/// deterministic; unknown shapes default to accept.
pub fn is_api_exchange(exchange: &RawExchange) -> bool {
    let url = exchange.request.url.to_lowercase();
    let content_type = exchange
        .response
        .as_ref()
        .and_then(|r| r.content_type())
        .unwrap_or("")
        .to_lowercase();

    let path = url_path(&url);
    if STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }

    if API_CONTENT_TYPES.iter().any(|t| content_type.contains(t)) {
        return true;
    }

    // fetch/XHR pattern: extensionless path or a common API prefix
    if !path_has_extension(path) || url.contains("/api/") || url.contains("/v1/") || url.contains("/v2/")
    {
        return true;
    }

    !(content_type.contains("image/")
        || content_type.contains("font/")
        || content_type.contains("video/")
        || content_type.contains("audio/"))
}

/// Path component of `url`, query and fragment stripped.
fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = match without_query.find("://") {
        Some(idx) => &without_query[idx + 3..],
        None => without_query,
    };
    match after_scheme.find('/') {
        Some(idx) => &after_scheme[idx..],
        None => "",
    }
}

fn path_has_extension(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RawRequest, RawResponse, ResponseBody};

    fn exchange(url: &str, content_type: Option<&str>) -> RawExchange {
        RawExchange {
            request: RawRequest {
                url: url.into(),
                method: "GET".into(),
                headers: Vec::new(),
            },
            response: content_type.map(|ct| RawResponse {
                status: 200,
                status_text: "OK".into(),
                headers: vec![("Content-Type".into(), ct.into())],
                headers_size: None,
                body_size: None,
            }),
            body: ResponseBody::Unavailable,
            elapsed_ms: None,
        }
    }

    #[test]
    fn rejects_static_asset_extensions() {
        assert!(!is_api_exchange(&exchange("https://x/logo.png", None)));
        assert!(!is_api_exchange(&exchange("https://x/app.CSS", None)));
        assert!(!is_api_exchange(&exchange(
            "https://x/font.woff2?v=3",
            Some("font/woff2")
        )));
        assert!(!is_api_exchange(&exchange("https://x/paper.pdf", None)));
    }

    #[test]
    fn accepts_api_content_types() {
        assert!(is_api_exchange(&exchange(
            "https://x/data.bin",
            Some("application/json; charset=utf-8")
        )));
        assert!(is_api_exchange(&exchange("https://x/page.phtml", Some("text/html"))));
    }

    #[test]
    fn accepts_extensionless_and_api_paths() {
        assert!(is_api_exchange(&exchange("https://x/api/v1/items", None)));
        assert!(is_api_exchange(&exchange("https://x/users", None)));
        assert!(is_api_exchange(&exchange("https://x/v2/search.json", None)));
    }

    #[test]
    fn media_content_type_rejects_by_default() {
        assert!(!is_api_exchange(&exchange(
            "https://x/stream.m3u8",
            Some("video/mp2t")
        )));
        // extensionless wins over the media content-type check
        assert!(is_api_exchange(&exchange("https://x/stream", Some("video/mp2t"))));
    }

    #[test]
    fn unknown_shapes_default_to_accept() {
        assert!(is_api_exchange(&exchange(
            "https://x/blob.dat",
            Some("application/octet-stream")
        )));
    }

    #[test]
    fn query_string_does_not_hide_extension() {
        assert!(!is_api_exchange(&exchange("https://x/img.png?size=2#frag", None)));
    }
}

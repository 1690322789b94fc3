//! Cross-site-scripting sanitization.
//!
//! Recursively scans every string value in the parsed JSON body, the raw
//! query pairs, and the route parameters. A string that matches any XSS
//! pattern has `<script>` blocks and inline event-handler attributes
//! removed, `javascript:` URL schemes neutralized, and the remaining markup
//! characters HTML-escaped. Strings with no suspicious content pass through
//! untouched.
//!
//! This stage mutates the exchange in place, forwards unconditionally, and
//! never errors: unsanitizable input becomes escaped text, not a rejection.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request};
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script[^>]*>").expect("valid script-block pattern")
});

static ORPHAN_SCRIPT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?script\b[^>]*>").expect("valid script-tag pattern")
});

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("valid event-handler pattern")
});

static JS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid js-scheme pattern"));

/// Middleware that strips XSS vectors from parsed request fields.
#[derive(Debug, Clone, Default)]
pub struct SanitizeMiddleware;

impl SanitizeMiddleware {
    /// Creates the sanitize stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Whether a string contains anything the sanitizer would rewrite.
fn is_suspicious(input: &str) -> bool {
    SCRIPT_BLOCK.is_match(input)
        || ORPHAN_SCRIPT_TAG.is_match(input)
        || EVENT_HANDLER.is_match(input)
        || JS_SCHEME.is_match(input)
        || input.contains('<')
        || input.contains('>')
}

/// Sanitizes one string value.
///
/// Script blocks, orphan script tags, and event-handler attributes are
/// removed outright; `javascript:` schemes are blanked; whatever markup
/// characters remain are HTML-escaped so the output can never re-enter a
/// document as live markup.
pub fn sanitize_str(input: &str) -> String {
    if !is_suspicious(input) {
        return input.to_string();
    }

    let cleaned = SCRIPT_BLOCK.replace_all(input, "");
    let cleaned = ORPHAN_SCRIPT_TAG.replace_all(&cleaned, "");
    let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
    let cleaned = JS_SCHEME.replace_all(&cleaned, "");

    html_escape(&cleaned)
}

fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Recursively sanitizes every string in a JSON value.
fn sanitize_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => {
            let cleaned = sanitize_str(s);
            if cleaned != *s {
                *s = cleaned;
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_value(item);
            }
        }
        serde_json::Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                sanitize_value(item);
            }
        }
        _ => {}
    }
}

impl Middleware for SanitizeMiddleware {
    fn name(&self) -> &'static str {
        "sanitize"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if let Some(body) = exchange.json_body_mut() {
                sanitize_value(body);
            }

            for (_, value) in exchange.raw_query_mut().iter_mut() {
                let cleaned = sanitize_str(value);
                if cleaned != *value {
                    *value = cleaned;
                }
            }

            for value in exchange.route_params_mut().values_mut() {
                let cleaned = sanitize_str(value);
                if cleaned != *value {
                    *value = cleaned;
                }
            }

            next.run(exchange, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};

    fn ok_next<'a>() -> Next<'a> {
        Next::handler(|_ex, _req| Box::pin(async { Ok(Response::text(StatusCode::OK, "ok")) }))
    }

    fn test_request() -> Request {
        HttpRequest::builder().uri("/").body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_clean_string_untouched() {
        assert_eq!(sanitize_str("plain product name"), "plain product name");
        assert_eq!(sanitize_str("50% off & free shipping"), "50% off & free shipping");
    }

    #[test]
    fn test_script_block_removed() {
        let out = sanitize_str("hello <script>alert(1)</script> world");
        assert!(!out.contains("<script"));
        assert!(!out.contains("alert(1)"));
        assert!(out.contains("hello"));
        assert!(out.contains("world"));
    }

    #[test]
    fn test_script_block_case_and_attrs() {
        let out = sanitize_str(r#"<SCRIPT src="evil.js"></SCRIPT>"#);
        assert!(!out.to_lowercase().contains("<script"));
    }

    #[test]
    fn test_orphan_script_tag_removed() {
        let out = sanitize_str("<script>no closer");
        assert!(!out.contains("<script"));
    }

    #[test]
    fn test_event_handler_removed() {
        let out = sanitize_str(r#"<img src=x onerror="alert(1)">"#);
        assert!(!out.to_lowercase().contains("onerror"));
    }

    #[test]
    fn test_javascript_scheme_removed() {
        let out = sanitize_str("<a href=javascript:alert(1)>x</a>");
        assert!(!out.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn test_residual_markup_escaped() {
        let out = sanitize_str("<b>bold</b>");
        assert_eq!(out, "&lt;b&gt;bold&lt;/b&gt;");
    }

    #[tokio::test]
    async fn test_body_strings_sanitized_recursively() {
        let mw = SanitizeMiddleware::new();
        let mut exchange = Exchange::new();
        exchange.set_json_body(serde_json::json!({
            "name": "<script>alert(1)</script>widget",
            "tags": ["ok", "<script>x</script>"],
            "nested": { "note": "<img onload=steal()>" },
            "count": 3,
        }));

        mw.process(&mut exchange, test_request(), ok_next())
            .await
            .unwrap();

        let body = serde_json::to_string(exchange.json_body().unwrap()).unwrap();
        assert!(!body.contains("<script>"));
        assert!(!body.contains("onload"));
        assert_eq!(exchange.json_body().unwrap()["count"], 3);
        assert!(exchange.json_body().unwrap()["name"]
            .as_str()
            .unwrap()
            .contains("widget"));
    }

    #[tokio::test]
    async fn test_query_values_sanitized() {
        let mw = SanitizeMiddleware::new();
        let mut exchange =
            Exchange::new().with_query(Some("q=%3Cscript%3Ealert(1)%3C%2Fscript%3E&page=2"));

        mw.process(&mut exchange, test_request(), ok_next())
            .await
            .unwrap();

        assert!(!exchange.raw_query()[0].1.contains("<script"));
        assert_eq!(exchange.raw_query()[1].1, "2");
    }

    #[tokio::test]
    async fn test_route_params_sanitized() {
        let mw = SanitizeMiddleware::new();
        let mut exchange = Exchange::new();
        exchange
            .route_params_mut()
            .insert("id".to_string(), "<script>1</script>".to_string());

        mw.process(&mut exchange, test_request(), ok_next())
            .await
            .unwrap();

        assert!(!exchange.route_params()["id"].contains("<script"));
    }

    #[tokio::test]
    async fn test_no_body_forwards() {
        let mw = SanitizeMiddleware::new();
        let mut exchange = Exchange::new();

        let response = mw
            .process(&mut exchange, test_request(), ok_next())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

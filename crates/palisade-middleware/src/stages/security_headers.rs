//! Protective response headers.
//!
//! The first stage in the pipeline. Stamps a fixed set of security headers
//! on every response that leaves the server, including rate-limit
//! rejections and rendered errors. It has no failure mode and always
//! forwards.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request};
use http::header::{HeaderName, HeaderValue};

/// The headers this stage sets on every response.
const SECURITY_HEADERS: [(HeaderName, HeaderValue); 8] = [
    (
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    ),
    (
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    ),
    (
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    ),
    (
        HeaderName::from_static("x-download-options"),
        HeaderValue::from_static("noopen"),
    ),
    (
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("0"),
    ),
    (
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=15552000; includeSubDomains"),
    ),
    (
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    ),
    (
        HeaderName::from_static("x-permitted-cross-domain-policies"),
        HeaderValue::from_static("none"),
    ),
];

/// Middleware that adds protective headers to every response.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeadersMiddleware;

impl SecurityHeadersMiddleware {
    /// Creates the security-headers stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for SecurityHeadersMiddleware {
    fn name(&self) -> &'static str {
        "security-headers"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let mut response = next.run(exchange, request).await?;

            let headers = response.headers_mut();
            for (name, value) in SECURITY_HEADERS {
                headers.insert(name, value);
            }

            Ok(response)
        })
    }
}

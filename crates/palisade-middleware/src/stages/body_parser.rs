//! JSON body parsing.
//!
//! When the request declares a JSON content type and carries a non-empty
//! body, this stage parses it into a `serde_json::Value` and attaches it to
//! the exchange. Malformed JSON raises a validation error that unwinds to
//! the error-handler stage as a 400; the process never crashes on bad
//! input. Requests without a JSON body forward unchanged.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request};
use http::header;
use palisade_core::PipelineError;

/// Middleware that parses JSON request bodies.
#[derive(Debug, Clone, Default)]
pub struct BodyParserMiddleware;

impl BodyParserMiddleware {
    /// Creates the body-parser stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether the request declares a JSON body.
    fn is_json(request: &Request) -> bool {
        request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| {
                let mime = ct.split(';').next().unwrap_or(ct).trim();
                mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
            })
            .unwrap_or(false)
    }
}

impl Middleware for BodyParserMiddleware {
    fn name(&self) -> &'static str {
        "body-parser"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if Self::is_json(&request) && !request.body().is_empty() {
                let value: serde_json::Value =
                    serde_json::from_slice(request.body()).map_err(PipelineError::from)?;
                exchange.set_json_body(value);
            }

            next.run(exchange, request).await
        })
    }
}

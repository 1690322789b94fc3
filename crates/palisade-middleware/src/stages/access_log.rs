//! Development access logging.
//!
//! Emits one structured log line per completed exchange: method, path,
//! status, latency, and the request ID. The server assembles this stage
//! only in development mode, so production carries no per-request logging
//! cost. Logging never affects the exchange or fails the request.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request};

/// Middleware that logs completed exchanges.
#[derive(Debug, Clone, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    /// Creates the access-log stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access-log"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            let outcome = next.run(exchange, request).await;

            // The error handler sits deeper in the chain, so by the time the
            // outcome reaches here errors have already been rendered; the Err
            // arm only fires on a missing error-handler stage.
            let status = match &outcome {
                Ok(response) => response.status(),
                Err(err) => err.status_code(),
            };

            tracing::info!(
                request_id = %exchange.request_id(),
                method = %method,
                path = %path,
                status = status.as_u16(),
                latency_ms = exchange.elapsed().as_millis() as u64,
                "request"
            );

            outcome
        })
    }
}

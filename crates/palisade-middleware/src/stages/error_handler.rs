//! The terminal error stage.
//!
//! Every error raised deeper in the pipeline (malformed bodies, unclaimed
//! exchanges, handler failures) unwinds to this stage and nowhere else. It
//! renders the JSON error envelope, exposing the source chain only in
//! development mode, and must never fail itself: if the response builder
//! errors, a canned 500 is returned instead.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request, Response};
use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use palisade_core::{ErrorKind, PipelineError};

/// Middleware that converts pipeline errors into terminal responses.
#[derive(Debug, Clone)]
pub struct ErrorHandlerMiddleware {
    /// Whether to include the error source chain in response bodies.
    expose_detail: bool,
}

impl ErrorHandlerMiddleware {
    /// Creates the error-handler stage.
    ///
    /// `expose_detail` should be true only in development mode.
    #[must_use]
    pub fn new(expose_detail: bool) -> Self {
        Self { expose_detail }
    }

    /// Renders an error into its terminal response.
    fn render(&self, err: &PipelineError, exchange: &Exchange) -> Response {
        if err.kind() == ErrorKind::Internal {
            tracing::error!(
                request_id = %exchange.request_id(),
                error = %err,
                "unhandled internal error"
            );
        }

        let envelope = err.to_envelope(self.expose_detail);
        let body = serde_json::to_string(&envelope)
            .unwrap_or_else(|_| r#"{"error":{"code":"INTERNAL_ERROR","message":"Internal error"}}"#.to_string());

        http::Response::builder()
            .status(err.status_code())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| {
                let mut fallback = http::Response::new(Full::new(Bytes::from_static(
                    br#"{"error":{"code":"INTERNAL_ERROR","message":"Internal error"}}"#,
                )));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

impl Middleware for ErrorHandlerMiddleware {
    fn name(&self) -> &'static str {
        "error-handler"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            match next.run(exchange, request).await {
                Ok(response) => Ok(response),
                Err(err) => Ok(self.render(&err, exchange)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Request as HttpRequest;

    fn test_request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_ok_passes_through() {
        use crate::types::ResponseExt;

        let mw = ErrorHandlerMiddleware::new(false);
        let mut exchange = Exchange::new();

        let next = Next::handler(|_ex, _req| {
            Box::pin(async { Ok(Response::text(StatusCode::OK, "fine")) })
        });

        let response = mw
            .process(&mut exchange, test_request(), next)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_found_rendered_with_path() {
        let mw = ErrorHandlerMiddleware::new(false);
        let mut exchange = Exchange::new();

        let next = Next::handler(|_ex, _req| {
            Box::pin(async {
                Err(PipelineError::not_found("/nonexistent-path"))
            })
        });

        let response = mw
            .process(&mut exchange, test_request(), next)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_string(response).await;
        assert!(body.contains("/nonexistent-path"));
    }

    #[tokio::test]
    async fn test_validation_rendered_as_400() {
        let mw = ErrorHandlerMiddleware::new(false);
        let mut exchange = Exchange::new();

        let next = Next::handler(|_ex, _req| {
            Box::pin(async { Err(PipelineError::validation("Invalid JSON body")) })
        });

        let response = mw
            .process(&mut exchange, test_request(), next)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detail_hidden_in_production() {
        let mw = ErrorHandlerMiddleware::new(false);
        let mut exchange = Exchange::new();

        let next = Next::handler(|_ex, _req| {
            Box::pin(async {
                let io = std::io::Error::new(std::io::ErrorKind::Other, "secret detail");
                Err(PipelineError::internal_with_source("handler failed", io))
            })
        });

        let response = mw
            .process(&mut exchange, test_request(), next)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(!body.contains("secret detail"));
    }

    #[tokio::test]
    async fn test_detail_shown_in_development() {
        let mw = ErrorHandlerMiddleware::new(true);
        let mut exchange = Exchange::new();

        let next = Next::handler(|_ex, _req| {
            Box::pin(async {
                let io = std::io::Error::new(std::io::ErrorKind::Other, "dev detail");
                Err(PipelineError::internal_with_source("handler failed", io))
            })
        });

        let response = mw
            .process(&mut exchange, test_request(), next)
            .await
            .unwrap();

        let body = body_string(response).await;
        assert!(body.contains("dev detail"));
    }
}

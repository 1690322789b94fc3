//! Common types used throughout the request pipeline.

use bytes::Bytes;
use http_body_util::Full;
use palisade_core::PipelineResult;

/// The HTTP request type used in the pipeline.
///
/// The server collects the inbound body before the pipeline runs, so stages
/// see a fully buffered `Bytes` body.
pub type Request = http::Request<Bytes>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// The outcome of one pipeline step: a response, or an error that continues
/// to propagate until the error-handler stage captures it.
pub type Outcome = PipelineResult<Response>;

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a plain-text response with the given status code and body.
    fn text(status: http::StatusCode, body: &str) -> Response;

    /// Creates a JSON response from a serializable value.
    fn json(status: http::StatusCode, value: &impl serde::Serialize) -> Response;
}

impl ResponseExt for Response {
    fn text(status: http::StatusCode, body: &str) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
    }

    fn json(status: http::StatusCode, value: &impl serde::Serialize) -> Response {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|_| r#"{"error":{"code":"INTERNAL_ERROR"}}"#.to_string());

        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
    }
}

//! End-to-end pipeline integration tests.
//!
//! These tests assemble the full stage set the server runs in development
//! mode and verify the stages work correctly together:
//!
//! 1. Security Headers - protective headers on every response
//! 2. Access Log - development-only request logging
//! 3. Error Handler - single terminal error renderer
//! 4. Rate Limit - per-client budget on the API prefix
//! 5. Body Parser - JSON body parsing
//! 6. Sanitize - XSS scrubbing of parsed fields
//! 7. Param Guard - query parameter collapse

use bytes::Bytes;
use http::{Request as HttpRequest, StatusCode};
use http_body_util::BodyExt;
use palisade_core::PipelineError;
use palisade_middleware::{
    context::Exchange,
    middleware::BoxFuture,
    pipeline::Pipeline,
    stages::{
        AccessLogMiddleware, BodyParserMiddleware, ErrorHandlerMiddleware, ParamGuardMiddleware,
        RateLimitBuilder, SanitizeMiddleware, SecurityHeadersMiddleware,
    },
    types::{Outcome, Request, Response, ResponseExt},
};
use std::time::Duration;

/// Builds the full development-mode pipeline.
fn build_full_pipeline() -> Pipeline {
    Pipeline::builder()
        .stage(SecurityHeadersMiddleware::new())
        .stage_if(true, AccessLogMiddleware::new())
        .stage(ErrorHandlerMiddleware::new(true))
        .stage(
            RateLimitBuilder::new()
                .max(3)
                .window(Duration::from_secs(60))
                .path_prefix("/api")
                .build(),
        )
        .stage(BodyParserMiddleware::new())
        .stage(SanitizeMiddleware::new())
        .stage(ParamGuardMiddleware::new())
        .build()
}

fn get(path: &str) -> Request {
    HttpRequest::builder()
        .method("GET")
        .uri(path)
        .body(Bytes::new())
        .unwrap()
}

/// A GET request carrying a client identity the rate limiter can key on.
fn get_from(path: &str, ip: &str) -> Request {
    HttpRequest::builder()
        .method("GET")
        .uri(path)
        .header("x-forwarded-for", ip)
        .body(Bytes::new())
        .unwrap()
}

fn post_json(path: &str, body: &str) -> Request {
    HttpRequest::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

/// A handler that answers 200 with a fixed body.
fn ok_handler(exchange: &mut Exchange, _request: Request) -> BoxFuture<'static, Outcome> {
    let _ = exchange;
    Box::pin(async { Ok(Response::text(StatusCode::OK, "handled")) })
}

/// A handler that raises a not-found error, like the unclaimed-path fallback.
fn not_found_handler(_exchange: &mut Exchange, request: Request) -> BoxFuture<'static, Outcome> {
    let path = request.uri().path().to_string();
    Box::pin(async move { Err(PipelineError::not_found(path)) })
}

async fn body_json(response: Response) -> serde_json::Value {
    let collected = response.into_body().collect().await.unwrap();
    serde_json::from_slice(&collected.to_bytes()).unwrap()
}

async fn body_text(response: Response) -> String {
    let collected = response.into_body().collect().await.unwrap();
    String::from_utf8(collected.to_bytes().to_vec()).unwrap()
}

#[tokio::test]
async fn security_headers_present_on_success_and_error() {
    let pipeline = build_full_pipeline();

    let mut exchange = Exchange::new();
    let ok = pipeline
        .process(&mut exchange, get("/api/products"), ok_handler)
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(
        ok.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(ok.headers().get("x-frame-options").unwrap(), "SAMEORIGIN");

    let mut exchange = Exchange::new();
    let err = pipeline
        .process(&mut exchange, get("/missing"), not_found_handler)
        .await
        .unwrap();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    // Headers are stamped on the rendered error response too.
    assert_eq!(
        err.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn rate_limit_rejects_after_budget() {
    let pipeline = build_full_pipeline();

    for _ in 0..3 {
        let mut exchange = Exchange::new();
        let response = pipeline
            .process(&mut exchange, get_from("/api/products", "10.0.0.9"), ok_handler)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Fourth request in the window is rejected with the verbatim message.
    let mut exchange = Exchange::new();
    let rejected = pipeline
        .process(&mut exchange, get_from("/api/products", "10.0.0.9"), ok_handler)
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_text(rejected).await,
        "Too many requests from this IP, Please try again latter!!!"
    );
}

#[tokio::test]
async fn rate_limit_ignores_non_api_paths() {
    let pipeline = build_full_pipeline();

    for _ in 0..10 {
        let mut exchange = Exchange::new();
        let response = pipeline
            .process(&mut exchange, get_from("/", "10.0.0.9"), ok_handler)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn malformed_json_renders_400_envelope() {
    let pipeline = build_full_pipeline();
    let mut exchange = Exchange::new();

    let response = pipeline
        .process(
            &mut exchange,
            post_json("/api/products", "{not json"),
            ok_handler,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn body_strings_are_sanitized_before_handler() {
    let pipeline = build_full_pipeline();
    let mut exchange = Exchange::new();

    let response = pipeline
        .process(
            &mut exchange,
            post_json(
                "/api/products",
                r#"{"name":"<script>alert(1)</script>widget","price":10}"#,
            ),
            ok_handler,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let name = exchange.json_body().unwrap()["name"].as_str().unwrap();
    assert!(!name.contains("<script>"));
    assert!(name.contains("widget"));
    assert_eq!(exchange.json_body().unwrap()["price"], 10);
}

#[tokio::test]
async fn repeated_query_keys_collapse_last_wins() {
    let pipeline = build_full_pipeline();
    let mut exchange = Exchange::new().with_query(Some("sort=price&sort=name&page=2"));

    pipeline
        .process(&mut exchange, get("/api/products"), ok_handler)
        .await
        .unwrap();

    assert_eq!(exchange.query_params()["sort"], "name");
    assert_eq!(exchange.query_params()["page"], "2");
}

#[tokio::test]
async fn not_found_envelope_carries_path() {
    let pipeline = build_full_pipeline();
    let mut exchange = Exchange::new();

    let response = pipeline
        .process(&mut exchange, get("/nonexistent-path"), not_found_handler)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["path"], "/nonexistent-path");
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn identical_requests_produce_identical_shapes() {
    let pipeline = build_full_pipeline();

    let mut first_exchange = Exchange::new();
    let first = pipeline
        .process(
            &mut first_exchange,
            post_json("/api/products", r#"{"name":"widget"}"#),
            ok_handler,
        )
        .await
        .unwrap();

    let mut second_exchange = Exchange::new();
    let second = pipeline
        .process(
            &mut second_exchange,
            post_json("/api/products", r#"{"name":"widget"}"#),
            ok_handler,
        )
        .await
        .unwrap();

    assert_eq!(first.status(), second.status());
    assert_eq!(
        first.headers().get("content-type"),
        second.headers().get("content-type")
    );
    assert_eq!(body_text(first).await, body_text(second).await);
}

#[tokio::test]
async fn internal_error_detail_hidden_without_dev_flag() {
    let pipeline = Pipeline::builder()
        .stage(SecurityHeadersMiddleware::new())
        .stage(ErrorHandlerMiddleware::new(false))
        .build();

    let mut exchange = Exchange::new();
    let response = pipeline
        .process(&mut exchange, get("/api/fail"), |_ex, _req| {
            Box::pin(async { Err(PipelineError::internal("database connection lost")) })
        })
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"]["detail"].is_null());
}

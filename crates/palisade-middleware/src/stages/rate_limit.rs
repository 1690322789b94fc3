//! Per-client request rate limiting.
//!
//! ## Windowing
//!
//! This limiter uses **fixed-window** counting: each client key owns a
//! counter whose window, once elapsed, is evicted and restarted from zero.
//! A client can therefore land up to `2 * max` requests straddling a window
//! boundary; that matches the original deployment's behavior and keeps the
//! counter store to one integer per key. Eviction runs on every check, so
//! idle clients do not accumulate entries.
//!
//! ## Scope and key
//!
//! Only requests whose path starts with the configured prefix are counted
//! (everything else forwards untouched). The client key is the first
//! `X-Forwarded-For` entry, then `X-Real-IP`, then the connection's remote
//! address; if none is available the request forwards uncounted.
//!
//! Rejected requests receive a 429 with a fixed plain-text message and
//! never reach the error-handler stage.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request, Response};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Rate limit response header names.
pub mod headers {
    /// Maximum requests allowed in the window.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Remaining requests in the current window.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Seconds until the window resets.
    pub const RESET: &str = "x-ratelimit-reset";
    /// Seconds to wait before retrying (on 429).
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Default window length: 15 minutes.
const DEFAULT_WINDOW_SECS: u64 = 15 * 60;

/// Default request budget per window.
const DEFAULT_MAX: u64 = 100;

/// The verbatim rejection message.
const DEFAULT_MESSAGE: &str = "Too many requests from this IP, Please try again latter!!!";

/// Rate limiting middleware.
#[derive(Debug)]
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    store: Arc<Mutex<HashMap<String, Window>>>,
}

impl Clone for RateLimitMiddleware {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

/// Configuration for the rate-limit stage.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    max: u64,
    /// Window length.
    window: Duration,
    /// Only paths starting with this prefix are limited. `None` limits all.
    path_prefix: Option<String>,
    /// Rejection message.
    message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            path_prefix: Some("/api".to_string()),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

/// One client's counter for the current window.
#[derive(Debug, Clone)]
struct Window {
    count: u64,
    started_at: Instant,
}

/// Builder for [`RateLimitMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct RateLimitBuilder {
    config: RateLimitConfig,
}

impl RateLimitBuilder {
    /// Creates a builder with the defaults (100 requests / 15 min / `/api`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum requests per window.
    #[must_use]
    pub fn max(mut self, max: u64) -> Self {
        self.config.max = max;
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Sets the window length in seconds.
    #[must_use]
    pub fn window_secs(self, seconds: u64) -> Self {
        self.window(Duration::from_secs(seconds))
    }

    /// Limits only paths starting with the given prefix.
    #[must_use]
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.path_prefix = Some(prefix.into());
        self
    }

    /// Limits every path.
    #[must_use]
    pub fn all_paths(mut self) -> Self {
        self.config.path_prefix = None;
        self
    }

    /// Sets the rejection message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.config.message = message.into();
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> RateLimitMiddleware {
        RateLimitMiddleware {
            config: self.config,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl RateLimitMiddleware {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RateLimitBuilder {
        RateLimitBuilder::new()
    }

    /// Creates the middleware with default settings.
    #[must_use]
    pub fn default_limits() -> Self {
        RateLimitBuilder::new().build()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether this request's path is subject to limiting.
    fn applies_to(&self, path: &str) -> bool {
        match &self.config.path_prefix {
            Some(prefix) => path.starts_with(prefix.as_str()),
            None => true,
        }
    }

    /// Extracts the client key from headers, falling back to the exchange's
    /// remote address.
    fn extract_key(request: &Request, exchange: &Exchange) -> Option<String> {
        if let Some(xff) = request.headers().get("x-forwarded-for") {
            if let Ok(value) = xff.to_str() {
                // X-Forwarded-For can contain multiple IPs, take the first
                return Some(value.split(',').next()?.trim().to_string());
            }
        }
        if let Some(real_ip) = request.headers().get("x-real-ip") {
            if let Ok(value) = real_ip.to_str() {
                return Some(value.to_string());
            }
        }
        exchange.client_addr().map(|addr| addr.ip().to_string())
    }

    /// Checks and updates the fixed-window counter for a key.
    ///
    /// Expired windows (including the caller's own) are evicted first, so
    /// the store never holds more than the clients seen in the last window.
    async fn check(&self, key: &str) -> Check {
        let mut store = self.store.lock().await;
        let now = Instant::now();
        let window = self.config.window;
        let max = self.config.max;

        store.retain(|_, entry| now.duration_since(entry.started_at) < window);

        let entry = store.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        let reset_in = window.saturating_sub(now.duration_since(entry.started_at));

        if entry.count >= max {
            Check::Limited { reset_in }
        } else {
            entry.count += 1;
            Check::Allowed {
                remaining: max - entry.count,
                reset_in,
            }
        }
    }

    /// Builds the 429 rejection.
    fn rejection(&self, reset_in: Duration) -> Response {
        let retry_after = reset_in.as_secs().max(1);

        http::Response::builder()
            .status(StatusCode::TOO_MANY_REQUESTS)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(headers::LIMIT, self.config.max.to_string())
            .header(headers::REMAINING, "0")
            .header(headers::RESET, retry_after.to_string())
            .header(headers::RETRY_AFTER, retry_after.to_string())
            .body(Full::new(Bytes::from(self.config.message.clone())))
            .unwrap_or_else(|_| {
                let mut fallback = http::Response::new(Full::new(Bytes::new()));
                *fallback.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                fallback
            })
    }

    /// Stamps budget headers on a forwarded response.
    fn stamp_headers(mut response: Response, max: u64, remaining: u64, reset_in: Duration) -> Response {
        let h = response.headers_mut();
        h.insert(headers::LIMIT, HeaderValue::from(max));
        h.insert(headers::REMAINING, HeaderValue::from(remaining));
        h.insert(headers::RESET, HeaderValue::from(reset_in.as_secs()));
        response
    }
}

/// Result of a counter check.
#[derive(Debug, Clone)]
enum Check {
    Allowed { remaining: u64, reset_in: Duration },
    Limited { reset_in: Duration },
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if !self.applies_to(request.uri().path()) {
                return next.run(exchange, request).await;
            }

            let key = match Self::extract_key(&request, exchange) {
                Some(key) => key,
                // No identifiable client, nothing to count against.
                None => return next.run(exchange, request).await,
            };

            match self.check(&key).await {
                Check::Allowed { remaining, reset_in } => {
                    let response = next.run(exchange, request).await?;
                    Ok(Self::stamp_headers(
                        response,
                        self.config.max,
                        remaining,
                        reset_in,
                    ))
                }
                Check::Limited { reset_in } => {
                    tracing::warn!(key = %key, "rate limit exceeded");
                    Ok(self.rejection(reset_in))
                }
            }
        })
    }
}

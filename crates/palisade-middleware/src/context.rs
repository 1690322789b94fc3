//! Per-request exchange context.
//!
//! The [`Exchange`] carries mutable state through the pipeline for one
//! request/response cycle. Stages enrich it as the request moves inward:
//! the body parser attaches the parsed JSON body, the sanitizer rewrites
//! string values in place, and the parameter guard collapses repeated query
//! keys into the final scalar map handlers consume.

use chrono::{DateTime, Utc};
use palisade_core::RequestId;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

/// Context that flows through the pipeline for one exchange.
///
/// Owned exclusively by the pipeline for the duration of one request and
/// dropped when the response is finalized.
///
/// # Example
///
/// ```
/// use palisade_middleware::Exchange;
///
/// let mut exchange = Exchange::new();
/// exchange.set_json_body(serde_json::json!({ "name": "widget" }));
/// assert!(exchange.json_body().is_some());
/// ```
#[derive(Debug)]
pub struct Exchange {
    /// Unique identifier for this exchange.
    request_id: RequestId,

    /// The client's socket address, when known.
    client_addr: Option<SocketAddr>,

    /// Wall-clock time the request was received.
    received_at: DateTime<Utc>,

    /// Monotonic start time, for latency measurement.
    started_at: Instant,

    /// Parsed JSON body, attached by the body-parser stage.
    json_body: Option<serde_json::Value>,

    /// Raw query pairs in request order, decoded. Repeated keys are still
    /// present here; the parameter guard collapses them.
    raw_query: Vec<(String, String)>,

    /// Collapsed single-value query parameters (after the parameter guard).
    query_params: HashMap<String, String>,

    /// Multi-value query parameters for allow-listed keys.
    multi_params: HashMap<String, Vec<String>>,

    /// Route parameters extracted by the router, if any.
    route_params: HashMap<String, String>,

    /// Type-erased extension data for stage-to-stage communication.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Exchange {
    /// Creates a new exchange with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            client_addr: None,
            received_at: Utc::now(),
            started_at: Instant::now(),
            json_body: None,
            raw_query: Vec::new(),
            query_params: HashMap::new(),
            multi_params: HashMap::new(),
            route_params: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Sets the client address (builder style).
    #[must_use]
    pub fn with_client_addr(mut self, addr: SocketAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    /// Parses a raw query string into ordered key/value pairs (builder style).
    ///
    /// Percent-encoding and `+` spaces are decoded; invalid escape sequences
    /// pass through literally. Repeated keys are kept; the parameter-guard
    /// stage applies the collapse policy later.
    #[must_use]
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        if let Some(query) = query {
            self.raw_query = serde_urlencoded::from_str(query).unwrap_or_default();
        }
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the client's socket address, if known.
    #[must_use]
    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    /// Returns the wall-clock time the request was received.
    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns the elapsed time since the exchange started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Returns the parsed JSON body, if the body-parser stage attached one.
    #[must_use]
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        self.json_body.as_ref()
    }

    /// Returns a mutable reference to the parsed JSON body.
    pub fn json_body_mut(&mut self) -> Option<&mut serde_json::Value> {
        self.json_body.as_mut()
    }

    /// Attaches the parsed JSON body.
    pub fn set_json_body(&mut self, body: serde_json::Value) {
        self.json_body = Some(body);
    }

    /// Returns the raw (uncollapsed) query pairs in request order.
    #[must_use]
    pub fn raw_query(&self) -> &[(String, String)] {
        &self.raw_query
    }

    /// Returns a mutable view of the raw query pairs.
    ///
    /// The sanitize stage rewrites values here before the parameter guard
    /// collapses them.
    pub fn raw_query_mut(&mut self) -> &mut Vec<(String, String)> {
        &mut self.raw_query
    }

    /// Returns the collapsed single-value query parameters.
    ///
    /// Empty until the parameter-guard stage has run.
    #[must_use]
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Replaces the collapsed query parameters.
    pub fn set_query_params(&mut self, params: HashMap<String, String>) {
        self.query_params = params;
    }

    /// Returns the multi-value parameters for allow-listed keys.
    #[must_use]
    pub fn multi_params(&self) -> &HashMap<String, Vec<String>> {
        &self.multi_params
    }

    /// Replaces the multi-value parameters.
    pub fn set_multi_params(&mut self, params: HashMap<String, Vec<String>>) {
        self.multi_params = params;
    }

    /// Returns the route parameters.
    #[must_use]
    pub fn route_params(&self) -> &HashMap<String, String> {
        &self.route_params
    }

    /// Returns a mutable reference to the route parameters.
    pub fn route_params_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.route_params
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

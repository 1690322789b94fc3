//! HTTP server implementation.
//!
//! The main HTTP server, built on Hyper and Tokio for async I/O.
//!
//! # Architecture
//!
//! - TCP listener bound to the configured port
//! - Connection handler for each incoming connection
//! - Request body collected up front, then processed through the
//!   [`Pipeline`] with the [`Fallback`] as the terminal dispatcher
//! - Graceful shutdown: the accept loop stops on the shutdown signal, then
//!   in-flight connections drain within the configured timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use palisade_server::{AppConfig, Fallback, Server};
//! use palisade_middleware::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env();
//!     let pipeline = Pipeline::builder().build();
//!     let server = Server::new(config, pipeline, Fallback::development());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use palisade_core::PipelineError;
use palisade_middleware::context::Exchange;
use palisade_middleware::middleware::BoxFuture;
use palisade_middleware::types::Outcome;
use palisade_middleware::Pipeline;

use crate::config::AppConfig;
use crate::fallback::Fallback;
use crate::shutdown::ShutdownSignal;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<Full<Bytes>>;

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Bind error: {0}")]
    Bind(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Counts in-flight connections so shutdown can wait for them to finish.
#[derive(Debug, Clone)]
struct ConnectionGauge {
    live: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl ConnectionGauge {
    fn new() -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Registers one connection; the returned guard deregisters on drop.
    fn track(&self) -> ConnectionGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            live: Arc::clone(&self.live),
            drained: Arc::clone(&self.drained),
        }
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for every tracked connection to finish.
    ///
    /// Returns `true` when the count reached zero, `false` on timeout.
    async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let mut drained = std::pin::pin!(self.drained.notified());
                // Register the waiter before the count check so a guard
                // dropped in between still wakes us.
                drained.as_mut().enable();
                if self.live() == 0 {
                    return;
                }
                drained.await;
            }
        })
        .await
        .is_ok()
    }
}

/// RAII handle for one tracked connection.
#[derive(Debug)]
struct ConnectionGuard {
    live: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.live.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// The Palisade HTTP server.
///
/// Owns the pipeline and terminal fallback, accepts connections, and runs
/// every request through them.
pub struct Server {
    /// Application configuration
    config: AppConfig,

    /// The fixed-order request pipeline
    pipeline: Arc<Pipeline>,

    /// Terminal dispatcher for requests no stage answers
    fallback: Arc<Fallback>,
}

impl Server {
    /// Creates a new server.
    #[must_use]
    pub fn new(config: AppConfig, pipeline: Pipeline, fallback: Fallback) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            fallback: Arc::new(fallback),
        }
    }

    /// Returns a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns a reference to the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs the server until a shutdown signal is received.
    ///
    /// Binds to `0.0.0.0` on the configured port and begins accepting
    /// connections. Handles graceful shutdown on SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs the server with a custom shutdown signal.
    ///
    /// Useful for tests and programmatic shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .bind_addr()
            .parse()
            .map_err(|e| ServerError::Bind(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!(
            "Server running {} mode on port {}",
            self.config.environment(),
            self.config.port()
        );

        let server = Arc::new(self);
        let gauge = ConnectionGauge::new();

        // Accept connections until shutdown
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let guard = gauge.track();
                            let shutdown_clone = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown_clone).await {
                                    tracing::error!("Connection error from {}: {}", remote_addr, e);
                                }
                                drop(guard);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = shutdown.triggered() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            "Waiting up to {:?} for {} connections to close",
            shutdown_timeout,
            gauge.live()
        );

        if gauge.drain(shutdown_timeout).await {
            tracing::info!("All connections closed");
        } else {
            tracing::warn!(
                "Shutdown timeout reached, {} connections still active",
                gauge.live()
            );
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Handles a single connection.
    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req, remote_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        tokio::select! {
            result = conn => {
                result
            }
            _ = shutdown.triggered() => {
                tracing::debug!("Connection from {} closed due to shutdown", remote_addr);
                Ok(())
            }
        }
    }

    /// Handles a single HTTP request.
    async fn handle_request(
        self: &Arc<Self>,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<HttpResponse, Infallible> {
        // Collect request body with timeout
        let body_result =
            tokio::time::timeout(self.config.request_timeout(), Self::collect_body(req)).await;

        let (request, exchange) = match body_result {
            Ok(Ok(req)) => {
                let exchange = Exchange::new()
                    .with_client_addr(remote_addr)
                    .with_query(req.uri().query());
                (req, exchange)
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to collect request body: {}", e);
                return Ok(error_response(&PipelineError::validation(
                    "Failed to read request body",
                )));
            }
            Err(_) => {
                tracing::warn!("Request body collection timed out");
                return Ok(error_response(&PipelineError::timeout(
                    "Request body collection timed out",
                )));
            }
        };

        let mut exchange = exchange;
        let outcome = tokio::time::timeout(
            self.config.request_timeout(),
            self.process(&mut exchange, request),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                // Only reachable if the pipeline was assembled without the
                // error-handler stage.
                tracing::error!(error = %err, "Unhandled pipeline error");
                Ok(error_response(&err))
            }
            Err(_) => {
                tracing::warn!("Request processing timed out");
                Ok(error_response(&PipelineError::timeout(
                    "Request processing timed out",
                )))
            }
        }
    }

    /// Runs one exchange through the pipeline with the fallback as the
    /// terminal handler.
    async fn process(
        self: &Arc<Self>,
        exchange: &mut Exchange,
        request: palisade_middleware::types::Request,
    ) -> Outcome {
        let fallback = Arc::clone(&self.fallback);
        let handler = move |exchange: &mut Exchange,
                            request: palisade_middleware::types::Request|
              -> BoxFuture<'static, Outcome> {
            let outcome = fallback.dispatch(exchange, &request);
            Box::pin(async move { outcome })
        };

        self.pipeline.process(exchange, request, handler).await
    }

    /// Collects the request body into bytes, preserving the head.
    async fn collect_body(
        req: Request<Incoming>,
    ) -> Result<palisade_middleware::types::Request, hyper::Error> {
        let (parts, body) = req.into_parts();
        let collected = body.collect().await?;
        Ok(Request::from_parts(parts, collected.to_bytes()))
    }
}

/// Renders a pipeline error outside the middleware chain.
///
/// Used for failures before or around the pipeline: body collection
/// errors, deadlines, and the residual case of a pipeline assembled
/// without the error-handler stage. Detail is never exposed on this path.
fn error_response(err: &PipelineError) -> HttpResponse {
    let body = serde_json::to_string(&err.to_envelope(false)).unwrap_or_else(|_| {
        r#"{"error":{"code":"INTERNAL_ERROR","message":"Internal error"}}"#.to_string()
    });

    Response::builder()
        .status(err.status_code())
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

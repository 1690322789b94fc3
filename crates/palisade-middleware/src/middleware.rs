//! Core middleware trait and chain types.
//!
//! This module defines the [`Middleware`] trait that all pipeline stages
//! implement, and the [`Next`] continuation a stage calls to forward the
//! exchange to the remainder of the chain.
//!
//! A stage has three possible outcomes for an exchange:
//!
//! - **forward**: call `next.run()` and return its outcome;
//! - **terminate**: return `Ok(response)` without calling `next` (the
//!   rate-limit rejection does this);
//! - **error**: return `Err(PipelineError)`, which propagates outward until
//!   the error-handler stage captures and renders it.
//!
//! # Example
//!
//! ```ignore
//! struct TimingMiddleware;
//!
//! impl Middleware for TimingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         exchange: &'a mut Exchange,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Outcome> {
//!         Box::pin(async move {
//!             let outcome = next.run(exchange, request).await;
//!             tracing::debug!(elapsed = ?exchange.elapsed(), "stage complete");
//!             outcome
//!         })
//!     }
//! }
//! ```

use crate::context::Exchange;
use crate::types::{Outcome, Request};
use std::future::Future;
use std::pin::Pin;

/// A boxed future returned by middleware stages.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// # Invariants
///
/// - A stage MUST call `next.run()` at most once.
/// - Only the error-handler stage converts an `Err` outcome into a final
///   response; every other stage passes errors through unchanged.
/// - Stages are registered once at startup and never mutated per-request.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage, used in logs and tests.
    fn name(&self) -> &'static str;

    /// Processes the exchange through this stage.
    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome>;
}

/// Continuation handle for the remainder of the chain.
///
/// Consumed by `run`, so a stage can only forward the exchange once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More stages to process.
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain: invoke the handler seam.
    Handler(Box<dyn FnOnce(&mut Exchange, Request) -> BoxFuture<'static, Outcome> + Send + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given stage.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut Exchange, Request) -> BoxFuture<'static, Outcome> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, exchange: &mut Exchange, request: Request) -> Outcome {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(exchange, request, *next).await
            }
            NextInner::Handler(handler) => handler(exchange, request).await,
        }
    }
}

//! Fixed-order request pipeline.
//!
//! The pipeline is an explicit ordered list of stages, assembled once at
//! startup and iterated for every request. Ordering is a visible data
//! structure ([`Stage`]), not a call-order convention.
//!
//! ## Stage order
//!
//! ```text
//! Request → SecurityHeaders → AccessLog* → ErrorHandler → RateLimit
//!         → BodyParser → Sanitize → ParamGuard → handler/fallback
//! ```
//!
//! (* assembled only in development mode)
//!
//! Stages wrap each other like an onion: request-phase work happens on the
//! way in, response-phase work on the way out. The error-handler stage sits
//! outside everything that can raise, so any `Err` from body parsing, the
//! handler, or the not-found fallback unwinds to exactly one place before
//! the access log observes the final status and the security headers are
//! stamped. The rate-limit rejection is an `Ok` short-circuit and therefore
//! never reaches the error handler.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request};
use std::sync::Arc;

/// A type-erased stage stored in the pipeline.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The fixed-order request pipeline.
///
/// Immutable after construction; shared across all connections via `Arc`.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::builder()
///     .stage(SecurityHeadersMiddleware::new())
///     .stage(ErrorHandlerMiddleware::new(true))
///     .build();
///
/// let outcome = pipeline.process(&mut exchange, request, handler).await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through every stage, then the handler.
    ///
    /// The outcome is `Ok` whenever the error-handler stage is assembled;
    /// a residual `Err` means the pipeline was built without one and the
    /// caller must render a generic failure.
    pub async fn process<H>(
        &self,
        exchange: &mut Exchange,
        request: Request,
        handler: H,
    ) -> Outcome
    where
        H: FnOnce(&mut Exchange, Request) -> BoxFuture<'static, Outcome> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(exchange, request).await
    }

    /// Builds the middleware chain, back to front, with the handler as the
    /// terminal point.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut Exchange, Request) -> BoxFuture<'static, Outcome> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage. Stages execute in the order they are added.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a stage only when `condition` holds.
    ///
    /// Used for environment-conditional stages (the access log), so the
    /// mode check happens once at assembly time rather than per request.
    #[must_use]
    pub fn stage_if<M: Middleware>(self, condition: bool, middleware: M) -> Self {
        if condition {
            self.stage(middleware)
        } else {
            self
        }
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The canonical stage order, as a testable data structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: protective response headers on every exchange.
    SecurityHeaders = 1,
    /// Stage 2: development-only access logging.
    AccessLog = 2,
    /// Stage 3: the single terminal error renderer.
    ErrorHandler = 3,
    /// Stage 4: per-client request budget for the API prefix.
    RateLimit = 4,
    /// Stage 5: JSON body parsing.
    BodyParser = 5,
    /// Stage 6: XSS sanitization of parsed fields.
    Sanitize = 6,
    /// Stage 7: query-parameter pollution guard.
    ParamGuard = 7,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SecurityHeaders => "security-headers",
            Self::AccessLog => "access-log",
            Self::ErrorHandler => "error-handler",
            Self::RateLimit => "rate-limit",
            Self::BodyParser => "body-parser",
            Self::Sanitize => "sanitize",
            Self::ParamGuard => "param-guard",
        }
    }

    /// Returns all stages in execution order.
    #[must_use]
    pub const fn all() -> [Stage; 7] {
        [
            Self::SecurityHeaders,
            Self::AccessLog,
            Self::ErrorHandler,
            Self::RateLimit,
            Self::BodyParser,
            Self::Sanitize,
            Self::ParamGuard,
        ]
    }
}

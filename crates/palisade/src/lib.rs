//! # Palisade
//!
//! **HTTP application server with a fixed-order protective middleware
//! pipeline**
//!
//! Palisade runs every request through the same ordered pipeline:
//!
//! ```text
//! Request → SecurityHeaders → AccessLog* → ErrorHandler → RateLimit
//!         → BodyParser → Sanitize → ParamGuard → handler/fallback
//! ```
//!
//! (* development mode only)
//!
//! The order is fixed at assembly and enforced by the pipeline rather than
//! by registration-call convention: protective stages always run before
//! parsing stages, and every error drains through the single error-handler
//! stage before the access log observes the final status.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use palisade::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env();
//!     let pipeline = Pipeline::builder()
//!         .stage(SecurityHeadersMiddleware::new())
//!         .stage(ErrorHandlerMiddleware::new(true))
//!         .build();
//!
//!     let server = Server::new(config, pipeline, Fallback::development());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use palisade_core as core;

// Re-export middleware types
pub use palisade_middleware as middleware;

// Re-export server types
pub use palisade_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use palisade::prelude::*;
/// ```
pub mod prelude {
    pub use palisade_core::{ErrorKind, PipelineError, PipelineResult, RequestId};

    pub use palisade_middleware::{
        AccessLogMiddleware, BodyParserMiddleware, ErrorHandlerMiddleware, Exchange, Middleware,
        Next, ParamGuardMiddleware, Pipeline, PipelineBuilder, RateLimitBuilder,
        RateLimitMiddleware, SanitizeMiddleware, SecurityHeadersMiddleware, Stage,
    };

    pub use palisade_server::{
        AppConfig, Environment, Fallback, Server, ServerError, ShutdownSignal, StaticFiles,
    };
}

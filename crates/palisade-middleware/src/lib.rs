//! # Palisade Middleware
//!
//! Middleware pipeline implementation for the Palisade server.
//!
//! This crate provides the fixed-order middleware pipeline that processes
//! all requests in Palisade. The stage order is immutable: protective
//! stages always run before parsing stages, and the error renderer is the
//! only place an error can become a response.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → SecurityHeaders → AccessLog → ErrorHandler → RateLimit
//!               → BodyParser → Sanitize → ParamGuard → Handler
//!                                                        ↓
//! Response ← SecurityHeaders ← AccessLog ← ErrorHandler ←┘
//! ```
//!
//! The pipeline has 7 fixed stages:
//!
//! | Stage | Middleware       | Purpose                                   |
//! |-------|------------------|-------------------------------------------|
//! | 1     | Security Headers | Stamp protective response headers          |
//! | 2     | Access Log       | Log method/path/status (development only)  |
//! | 3     | Error Handler    | Render every error as a JSON envelope      |
//! | 4     | Rate Limit       | Per-client budget on the API prefix        |
//! | 5     | Body Parser      | Parse JSON request bodies                  |
//! | 6     | Sanitize         | Strip XSS vectors from parsed fields       |
//! | 7     | Param Guard      | Collapse duplicated query parameters       |
//!
//! Stages 1-3 are outermost because they also shape responses: security
//! headers appear on every response including errors, the access log sees
//! the final status, and the error handler catches failures raised by any
//! stage inside it. The rate-limit rejection is an ordinary response, not
//! an error, so it passes through the error handler unchanged.
//!
//! ## Example
//!
//! ```
//! use palisade_middleware::pipeline::Stage;
//!
//! // Pipeline stages are fixed
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 7);
//! assert_eq!(stages[0].name(), "security-headers");
//! assert_eq!(stages[6].name(), "param-guard");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use context::Exchange;
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use stages::{
    AccessLogMiddleware, BodyParserMiddleware, ErrorHandlerMiddleware, ParamGuardMiddleware,
    RateLimitBuilder, RateLimitMiddleware, SanitizeMiddleware, SecurityHeadersMiddleware,
};
pub use types::{Outcome, Request, Response, ResponseExt};

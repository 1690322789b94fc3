//! The pipeline stage implementations.
//!
//! Stages are listed here in execution order (see
//! [`Stage`](crate::pipeline::Stage)):
//!
//! 1. [`security_headers`] - protective response headers
//! 2. [`access_log`] - development-only access logging
//! 3. [`error_handler`] - the single terminal error renderer
//! 4. [`rate_limit`] - per-client request budget for the API prefix
//! 5. [`body_parser`] - JSON body parsing
//! 6. [`sanitize`] - XSS sanitization of parsed fields
//! 7. [`param_guard`] - query-parameter pollution guard

pub mod access_log;
pub mod body_parser;
pub mod error_handler;
pub mod param_guard;
pub mod rate_limit;
pub mod sanitize;
pub mod security_headers;

pub use access_log::AccessLogMiddleware;
pub use body_parser::BodyParserMiddleware;
pub use error_handler::ErrorHandlerMiddleware;
pub use param_guard::ParamGuardMiddleware;
pub use rate_limit::{RateLimitBuilder, RateLimitMiddleware};
pub use sanitize::SanitizeMiddleware;
pub use security_headers::SecurityHeadersMiddleware;

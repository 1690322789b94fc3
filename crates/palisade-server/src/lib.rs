//! # Palisade Server
//!
//! HTTP server infrastructure for the Palisade application server:
//!
//! - HTTP/1.1 support via Hyper
//! - Environment-driven configuration (`PORT`, `NODE_ENV`, `STATIC_ROOT`)
//! - Static asset serving with SPA index fallback (production)
//! - Structured logging, pretty in development and JSON in production
//! - Graceful shutdown
//!
//! ## Example
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

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod fallback;
pub mod logging;
pub mod server;
pub mod shutdown;
pub mod static_files;

// Re-export main types at crate root
pub use config::{AppConfig, AppConfigBuilder, Environment};
pub use fallback::Fallback;
pub use logging::{init_logging, LogConfig, LoggingError};
pub use server::{Server, ServerError};
pub use shutdown::ShutdownSignal;
pub use static_files::{StaticFileError, StaticFiles};

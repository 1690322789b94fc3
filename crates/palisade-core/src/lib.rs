//! # Palisade Core
//!
//! Core types shared across the Palisade application server: the error
//! taxonomy used by the request pipeline and the per-exchange request ID.
//!
//! Every error a pipeline stage or downstream handler can raise is a
//! [`PipelineError`]. Errors are classified by [`ErrorKind`], which maps to
//! an HTTP status code, and rendered as a JSON [`ErrorEnvelope`] by the
//! terminal error stage. No other component writes a final error response.

#![doc(html_root_url = "https://docs.rs/palisade-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod request_id;

pub use error::{ErrorEnvelope, ErrorKind, PipelineError, PipelineResult};
pub use request_id::RequestId;

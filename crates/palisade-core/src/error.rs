//! Error types for the Palisade request pipeline.
//!
//! This module provides [`PipelineError`], the single error type that flows
//! through the pipeline. Stages and downstream handlers never write their own
//! terminal error responses; they raise a `PipelineError` and the terminal
//! error stage renders it.
//!
//! The taxonomy:
//!
//! | [`ErrorKind`] | Status | Raised by |
//! |---|---|---|
//! | `Validation`  | 400 | body parsing, pollution violations |
//! | `NotFound`    | 404 | unclaimed exchanges (not-found terminal) |
//! | `Timeout`     | 504 | body collection / handler timeouts |
//! | `Internal`    | 500 | anything uncaught |
//!
//! Rate-limit rejections are not part of this taxonomy: the rate-limit
//! stage short-circuits with a fixed plain-text 429 and never raises an
//! error.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Classification of pipeline errors, mapped to HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed client input (bad JSON body, pollution violations).
    Validation,
    /// No route, asset, or fallback claimed the exchange.
    NotFound,
    /// Body collection or handler execution exceeded its deadline.
    Timeout,
    /// Uncaught failure from a stage or downstream handler.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this error kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable error code used in envelopes.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// The standard error type for the Palisade pipeline.
///
/// # Example
///
/// ```
/// use palisade_core::{ErrorKind, PipelineError};
///
/// let err = PipelineError::not_found("/missing");
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Request validation failed (malformed body, bad parameters).
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// No handler, asset, or fallback matched the request.
    #[error("Not Found - {path}")]
    NotFound {
        /// The originally requested path.
        path: String,
    },

    /// A deadline elapsed while processing the exchange.
    #[error("Timeout: {message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Any uncaught internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PipelineError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not-found error annotated with the requested path.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates an internal error without an underlying cause.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping an underlying cause.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns the unmatched path for not-found errors.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotFound { path } => Some(path),
            _ => None,
        }
    }

    /// Converts this error into a serializable envelope.
    ///
    /// `include_detail` controls whether the source chain is exposed; the
    /// error stage enables it only in development mode.
    #[must_use]
    pub fn to_envelope(&self, include_detail: bool) -> ErrorEnvelope {
        let detail = if include_detail {
            Some(self.detail_chain())
        } else {
            None
        };

        ErrorEnvelope {
            error: ErrorBody {
                code: self.kind().code().to_string(),
                message: self.to_string(),
                path: self.path().map(String::from),
                detail,
            },
        }
    }

    /// Renders the full source chain, outermost first.
    fn detail_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(format!("Invalid JSON body: {err}"))
    }
}

/// The JSON error envelope written by the terminal error stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error payload.
    pub error: ErrorBody,
}

/// The body of an [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// The unmatched path, for not-found errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source chain, present only in development mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<String>>,
}

//! Static asset serving for the production frontend build.
//!
//! Serves files from the built frontend directory, with:
//!
//! - Index file fallback (`index.html`) for directory requests
//! - `Cache-Control` and `Last-Modified` headers
//! - MIME type detection by file extension
//! - Directory traversal and hidden file protection
//!
//! # Example
//!
//! ```rust
//! use palisade_server::static_files::StaticFiles;
//!
//! let assets = StaticFiles::new("./frontend/build")
//!     .index("index.html")
//!     .cache_control("max-age=3600");
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use http::{header, HeaderMap, Method, Response, StatusCode};
use http_body_util::Full;
use thiserror::Error;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<Full<Bytes>>;

/// Errors that can occur when serving static files.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// The requested file was not found.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path is forbidden (traversal attempt or hidden file).
    #[error("Forbidden path: {0}")]
    Forbidden(String),

    /// Method not allowed (only GET and HEAD are served).
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// I/O error while reading the file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StaticFileError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Static file server rooted at a single directory.
///
/// # Example
///
/// ```rust
/// use palisade_server::static_files::StaticFiles;
///
/// let assets = StaticFiles::new("./frontend/build")
///     .index("index.html")
///     .cache_control("max-age=86400, public");
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    /// Root directory for static files
    root: PathBuf,

    /// Index file name (e.g., "index.html")
    index_file: Option<String>,

    /// Default Cache-Control header value
    cache_control: Option<String>,

    /// Whether to include Last-Modified headers
    last_modified_enabled: bool,
}

impl StaticFiles {
    /// Creates a new static file server for the given root directory.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index_file: None,
            cache_control: None,
            last_modified_enabled: true,
        }
    }

    /// Sets the index file served for directory requests.
    #[must_use]
    pub fn index<S: Into<String>>(mut self, index: S) -> Self {
        self.index_file = Some(index.into());
        self
    }

    /// Sets the Cache-Control header value for responses.
    #[must_use]
    pub fn cache_control<S: Into<String>>(mut self, value: S) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Enables or disables Last-Modified headers.
    #[must_use]
    pub fn last_modified(mut self, enabled: bool) -> Self {
        self.last_modified_enabled = enabled;
        self
    }

    /// Returns the root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configured index file.
    #[must_use]
    pub fn index_file(&self) -> Option<&str> {
        self.index_file.as_deref()
    }

    /// Returns `true` when a regular file exists for the request path.
    ///
    /// Used by the fallback dispatcher to decide between an asset and the
    /// SPA index page. Paths that fail the security checks count as absent.
    #[must_use]
    pub fn contains(&self, request_path: &str) -> bool {
        self.resolve_path(request_path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Handles an HTTP request for a static file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The method is not GET or HEAD
    /// - The path contains directory traversal attempts or hidden segments
    /// - The file is not found
    /// - An I/O error occurs
    pub fn handle(
        &self,
        request_path: &str,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<HttpResponse, StaticFileError> {
        // Only allow GET and HEAD methods
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let file_path = self.resolve_path(request_path)?;

        if file_path.is_dir() {
            // Try to serve index file
            if let Some(ref index) = self.index_file {
                let index_path = file_path.join(index);
                if index_path.is_file() {
                    return self.serve_file(&index_path, headers, method);
                }
            }
            return Err(StaticFileError::NotFound(request_path.to_string()));
        }

        self.serve_file(&file_path, headers, method)
    }

    /// Resolves a request path to an absolute file path.
    ///
    /// Performs security checks to prevent directory traversal and hidden
    /// file access.
    fn resolve_path(&self, request_path: &str) -> Result<PathBuf, StaticFileError> {
        let path = request_path.trim_start_matches('/');

        for component in Path::new(path).components() {
            match component {
                std::path::Component::ParentDir => {
                    return Err(StaticFileError::Forbidden(
                        "Directory traversal not allowed".to_string(),
                    ));
                }
                std::path::Component::Normal(name) => {
                    if let Some(name_str) = name.to_str() {
                        if name_str.starts_with('.') {
                            return Err(StaticFileError::Forbidden(
                                "Hidden files not allowed".to_string(),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        let full_path = self.root.join(path);

        // Canonicalize to resolve symlinks and get an absolute path
        let canonical = full_path
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;

        // Verify the resolved path is still inside the root directory
        let canonical_root = self.root.canonicalize().map_err(|e| {
            StaticFileError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Root directory not found: {}", e),
            ))
        })?;

        if !canonical.starts_with(&canonical_root) {
            return Err(StaticFileError::Forbidden(
                "Path escapes root directory".to_string(),
            ));
        }

        Ok(canonical)
    }

    /// Serves a file from the filesystem.
    fn serve_file(
        &self,
        path: &Path,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<HttpResponse, StaticFileError> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified().ok();

        // Check If-Modified-Since for 304 Not Modified
        if self.last_modified_enabled {
            if let Some(ref last_mod) = modified {
                if let Some(if_modified_since) = headers.get(header::IF_MODIFIED_SINCE) {
                    if let Ok(value) = if_modified_since.to_str() {
                        if let Ok(since) = httpdate::parse_http_date(value) {
                            if not_modified_since(*last_mod, since) {
                                return Ok(self.not_modified_response());
                            }
                        }
                    }
                }
            }
        }

        let mime_type = detect_mime_type(path);

        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(std::fs::read(path)?)
        };
        let content_length = metadata.len();

        self.build_response(body, content_length, mime_type, modified.as_ref())
    }

    /// Builds the HTTP response.
    fn build_response(
        &self,
        body: Bytes,
        content_length: u64,
        mime_type: &str,
        modified: Option<&SystemTime>,
    ) -> Result<HttpResponse, StaticFileError> {
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, content_length.to_string());

        if let Some(ref cache_control) = self.cache_control {
            builder = builder.header(header::CACHE_CONTROL, cache_control.as_str());
        }

        if self.last_modified_enabled {
            if let Some(modified) = modified {
                let formatted = httpdate::fmt_http_date(*modified);
                builder = builder.header(header::LAST_MODIFIED, formatted);
            }
        }

        builder
            .body(Full::new(body))
            .map_err(|e| StaticFileError::IoError(std::io::Error::other(e.to_string())))
    }

    /// Builds a 304 Not Modified response.
    fn not_modified_response(&self) -> HttpResponse {
        let mut builder = Response::builder().status(StatusCode::NOT_MODIFIED);

        if let Some(ref cache_control) = self.cache_control {
            builder = builder.header(header::CACHE_CONTROL, cache_control.as_str());
        }

        builder
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }
}

/// Compares modification times, truncating to whole seconds.
fn not_modified_since(last_mod: SystemTime, since: SystemTime) -> bool {
    match (
        last_mod.duration_since(SystemTime::UNIX_EPOCH),
        since.duration_since(SystemTime::UNIX_EPOCH),
    ) {
        (Ok(modified), Ok(since)) => modified.as_secs() <= since.as_secs(),
        _ => false,
    }
}

/// Detects the MIME type for a file by extension.
fn detect_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Web
        "wasm" => "application/wasm",
        "manifest" | "webmanifest" => "application/manifest+json",

        // Default
        _ => "application/octet-stream",
    }
}

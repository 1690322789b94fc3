//! Server configuration types.
//!
//! Configuration comes from process environment variables, matching the
//! deployment conventions the server is operated under:
//!
//! - `PORT` - TCP port to bind (default 5000)
//! - `NODE_ENV` - runtime mode, `production` or anything else (development)
//! - `STATIC_ROOT` - directory of built frontend assets (production only)
//!
//! # Example
//!
//! ```rust
//! use palisade_server::config::{AppConfig, Environment};
//!
//! let config = AppConfig::builder()
//!     .port(8080)
//!     .environment(Environment::Production)
//!     .build();
//!
//! assert_eq!(config.port(), 8080);
//! assert!(config.environment().is_production());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default TCP port when `PORT` is unset or unparseable.
pub const DEFAULT_PORT: u16 = 5000;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request timeout in seconds (body collection and handling).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default directory for built frontend assets.
pub const DEFAULT_STATIC_ROOT: &str = "frontend/build";

/// The runtime mode the server operates in.
///
/// Derived from `NODE_ENV`: the exact string `production` selects
/// [`Environment::Production`]; every other value, including unset, selects
/// [`Environment::Development`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Development mode: access logging on, error detail exposed, no
    /// static asset serving.
    Development,
    /// Production mode: static assets and SPA fallback, error detail
    /// suppressed.
    Production,
}

impl Environment {
    /// Parses the mode from a `NODE_ENV`-style string.
    #[must_use]
    pub fn from_str_mode(value: &str) -> Self {
        if value == "production" {
            Self::Production
        } else {
            Self::Development
        }
    }

    /// Reads the mode from the `NODE_ENV` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("NODE_ENV")
            .map(|v| Self::from_str_mode(&v))
            .unwrap_or(Self::Development)
    }

    /// Returns `true` in production mode.
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    /// Returns `true` in development mode.
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    /// Returns the mode name used in the startup log line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration.
///
/// Use [`AppConfig::builder()`] to construct instances, or
/// [`AppConfig::from_env()`] to read the process environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to bind.
    port: u16,

    /// Runtime mode.
    environment: Environment,

    /// Directory of built frontend assets (served in production).
    static_root: PathBuf,

    /// Timeout for graceful shutdown.
    shutdown_timeout: Duration,

    /// Timeout for body collection and request handling.
    request_timeout: Duration,
}

impl AppConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Builds the configuration from process environment variables.
    ///
    /// An unparseable `PORT` value falls back to the default rather than
    /// failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let static_root = std::env::var("STATIC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_ROOT));

        Self {
            port,
            environment: Environment::from_env(),
            static_root,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Returns the TCP port to bind.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the runtime mode.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the static asset root directory.
    #[must_use]
    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the bind address string, always on all interfaces.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppConfigBuilder {
    port: u16,
    environment: Environment,
    static_root: PathBuf,
    shutdown_timeout: Duration,
    request_timeout: Duration,
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::Development,
            static_root: PathBuf::from(DEFAULT_STATIC_ROOT),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AppConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TCP port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the runtime mode.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the static asset root directory.
    #[must_use]
    pub fn static_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.static_root = root.as_ref().to_path_buf();
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> AppConfig {
        AppConfig {
            port: self.port,
            environment: self.environment,
            static_root: self.static_root,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!(
            Environment::from_str_mode("production"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_mode("development"),
            Environment::Development
        );
        // Anything that is not exactly "production" is development.
        assert_eq!(
            Environment::from_str_mode("Production"),
            Environment::Development
        );
        assert_eq!(Environment::from_str_mode(""), Environment::Development);
        assert_eq!(Environment::from_str_mode("staging"), Environment::Development);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert!(config.environment().is_development());
        assert_eq!(config.static_root(), Path::new(DEFAULT_STATIC_ROOT));
    }

    #[test]
    fn test_builder() {
        let config = AppConfig::builder()
            .port(8080)
            .environment(Environment::Production)
            .static_root("/srv/app/build")
            .shutdown_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.port(), 8080);
        assert!(config.environment().is_production());
        assert_eq!(config.static_root(), Path::new("/srv/app/build"));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_bind_addr() {
        let config = AppConfig::builder().port(3000).build();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }
}

//! Terminal request dispatcher.
//!
//! The fallback runs at the innermost point of the pipeline, after every
//! stage has forwarded the exchange. What it does depends on the runtime
//! mode:
//!
//! - **Production**: serve the requested static asset if one exists under
//!   the frontend build directory; otherwise serve `index.html` so
//!   client-side routing can take over (SPA fallback). Applies to GET and
//!   HEAD only.
//! - **Development**: answer `GET /` (and `HEAD /`) with a plain liveness
//!   message; no static assets are served.
//!
//! Any request neither mode claims becomes a not-found error, which the
//! error-handler stage renders as the 404 envelope carrying the path.

use crate::static_files::StaticFiles;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH};
use http::Method;
use http::StatusCode;
use http_body_util::Full;
use palisade_core::PipelineError;
use palisade_middleware::context::Exchange;
use palisade_middleware::types::{Outcome, Request, Response, ResponseExt};

/// Liveness message answered on `GET /` in development mode.
pub const DEV_ROOT_MESSAGE: &str = "API is running....";

/// Mode-specific terminal behavior.
enum FallbackMode {
    /// Development: liveness message on the root path only.
    Development,
    /// Production: static assets with SPA index fallback.
    Production(StaticFiles),
}

/// The terminal dispatcher invoked when no stage has produced a response.
pub struct Fallback {
    mode: FallbackMode,
}

impl Fallback {
    /// Creates the development-mode fallback.
    #[must_use]
    pub fn development() -> Self {
        Self {
            mode: FallbackMode::Development,
        }
    }

    /// Creates the production-mode fallback over the given asset directory.
    #[must_use]
    pub fn production(assets: StaticFiles) -> Self {
        Self {
            mode: FallbackMode::Production(assets),
        }
    }

    /// Dispatches the request.
    ///
    /// Returns `Err` with a not-found error for unclaimed requests; the
    /// error-handler stage turns that into the 404 response.
    pub fn dispatch(&self, _exchange: &Exchange, request: &Request) -> Outcome {
        let method = request.method();
        let path = request.uri().path();

        match &self.mode {
            FallbackMode::Development => {
                if path == "/" && (method == Method::GET || method == Method::HEAD) {
                    let mut response = Response::text(StatusCode::OK, DEV_ROOT_MESSAGE);
                    if method == Method::HEAD {
                        // Same head as the GET answer, empty body.
                        response
                            .headers_mut()
                            .insert(CONTENT_LENGTH, HeaderValue::from(DEV_ROOT_MESSAGE.len()));
                        *response.body_mut() = Full::new(Bytes::new());
                    }
                    return Ok(response);
                }
                Err(PipelineError::not_found(path))
            }
            FallbackMode::Production(assets) => {
                if method != Method::GET && method != Method::HEAD {
                    return Err(PipelineError::not_found(path));
                }

                // Serve the asset when one exists for this exact path.
                if assets.contains(path) {
                    if let Ok(response) = assets.handle(path, request.headers(), method) {
                        return Ok(response);
                    }
                }

                // SPA fallback: every other GET gets the index page so the
                // client router can resolve the path.
                let index = assets.index_file().unwrap_or("index.html");
                assets
                    .handle(&format!("/{index}"), request.headers(), method)
                    .map_err(|_| PipelineError::not_found(path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Request as HttpRequest;
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;

    fn request(method: Method, path: &str) -> Request {
        HttpRequest::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let collected = response.into_body().collect().await.unwrap();
        String::from_utf8(collected.to_bytes().to_vec()).unwrap()
    }

    fn build_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html>App</html>").unwrap();
        fs::write(dir.path().join("main.css"), "body {}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_development_root_liveness() {
        let fallback = Fallback::development();
        let exchange = Exchange::new();

        let response = fallback
            .dispatch(&exchange, &request(Method::GET, "/"))
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, DEV_ROOT_MESSAGE);
    }

    #[test]
    fn test_development_other_path_is_not_found() {
        let fallback = Fallback::development();
        let exchange = Exchange::new();

        let err = fallback
            .dispatch(&exchange, &request(Method::GET, "/api/products"))
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.path(), Some("/api/products"));
    }

    #[tokio::test]
    async fn test_development_head_root_is_empty_liveness() {
        let fallback = Fallback::development();
        let exchange = Exchange::new();

        let response = fallback
            .dispatch(&exchange, &request(Method::HEAD, "/"))
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "18");
        assert!(body_text(response).await.is_empty());
    }

    #[test]
    fn test_development_post_root_is_not_found() {
        let fallback = Fallback::development();
        let exchange = Exchange::new();

        let err = fallback
            .dispatch(&exchange, &request(Method::POST, "/"))
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_production_serves_existing_asset() {
        let dir = build_dir();
        let fallback = Fallback::production(StaticFiles::new(dir.path()).index("index.html"));
        let exchange = Exchange::new();

        let response = fallback
            .dispatch(&exchange, &request(Method::GET, "/main.css"))
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "body {}");
    }

    #[tokio::test]
    async fn test_production_spa_fallback_to_index() {
        let dir = build_dir();
        let fallback = Fallback::production(StaticFiles::new(dir.path()).index("index.html"));
        let exchange = Exchange::new();

        // No such asset; the index page answers for the client router.
        let response = fallback
            .dispatch(&exchange, &request(Method::GET, "/products/42"))
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<html>App</html>");
    }

    #[test]
    fn test_production_non_get_is_not_found() {
        let dir = build_dir();
        let fallback = Fallback::production(StaticFiles::new(dir.path()).index("index.html"));
        let exchange = Exchange::new();

        let err = fallback
            .dispatch(&exchange, &request(Method::POST, "/api/orders"))
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.path(), Some("/api/orders"));
    }

    #[test]
    fn test_production_missing_index_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fallback = Fallback::production(StaticFiles::new(dir.path()).index("index.html"));
        let exchange = Exchange::new();

        let err = fallback
            .dispatch(&exchange, &request(Method::GET, "/anything"))
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}

//! Palisade server binary.
//!
//! Reads configuration from the process environment (and a `.env` file when
//! present), assembles the fixed-order pipeline for the configured mode,
//! and runs the HTTP server until shutdown. A failed bind exits non-zero.

use anyhow::Context;
use palisade::prelude::*;
use palisade_server::logging::{init_logging, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is not an error; the process environment wins.
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    let environment = config.environment();

    let log_config = if environment.is_development() {
        LogConfig::development()
    } else {
        LogConfig::production()
    };
    init_logging(&log_config).context("failed to initialize logging")?;

    let pipeline = Pipeline::builder()
        .stage(SecurityHeadersMiddleware::new())
        .stage_if(environment.is_development(), AccessLogMiddleware::new())
        .stage(ErrorHandlerMiddleware::new(environment.is_development()))
        .stage(RateLimitMiddleware::default_limits())
        .stage(BodyParserMiddleware::new())
        .stage(SanitizeMiddleware::new())
        .stage(ParamGuardMiddleware::new())
        .build();

    let fallback = if environment.is_production() {
        Fallback::production(
            StaticFiles::new(config.static_root())
                .index("index.html")
                .cache_control("max-age=3600, public"),
        )
    } else {
        Fallback::development()
    };

    let server = Server::new(config, pipeline, fallback);
    server.run().await.context("server failed")?;

    Ok(())
}

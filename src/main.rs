//! LyricShare server entry point.

use std::sync::Arc;

use mimalloc::MiMalloc;
use tracing::info;

use lyricshare::{config::AppConfig, server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = match AppConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init(&config.telemetry);

    info!(
        name: "config.loaded",
        environment = ?config.environment,
        provider = ?config.persistence.provider,
        port = config.server.port,
        "Configuration loaded"
    );

    if let Err(e) = server::start_server(config).await {
        tracing::error!(name: "server.fatal", error = ?e, "Server terminated");
        std::process::exit(1);
    }
}

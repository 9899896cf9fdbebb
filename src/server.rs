use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api;
use crate::config::{AppConfig, PersistenceProviderKind, ServerConfig};
use crate::persistence::{
    PersistenceLayer,
    providers::{memory::MemoryProvider, postgres::PostgresProvider},
};
use crate::security::middleware::auth_middleware;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::{TokenService, TokenSettings};

/// Request bodies larger than this are rejected with 413.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Resolve secrets, open the store, and serve until the listener fails.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = TokenSettings::from_config(&config.security, config.environment)
        .context("invalid token configuration")?;
    let tokens = Arc::new(TokenService::new(settings));

    let persistence: Arc<dyn PersistenceLayer> = match config.persistence.provider {
        PersistenceProviderKind::Postgres => {
            let url = config
                .persistence
                .database_url
                .as_deref()
                .context("persistence.database_url is required for the postgres provider")?;
            let provider = PostgresProvider::new(url, config.persistence.max_connections)
                .await
                .context("failed to initialize Postgres")?;
            Arc::new(provider)
        }
        PersistenceProviderKind::Memory => {
            tracing::warn!(
                name: "persistence.memory.enabled",
                "Using the in-memory store; data is lost on restart"
            );
            Arc::new(MemoryProvider::new())
        }
    };

    let state = AppState::new(Arc::clone(&config), persistence, tokens);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// The full application: `/health` plus the authenticated `/api` tree,
/// wrapped in tracing, CORS, rate limiting, timeout and body-size limits.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.resilience.request_timeout_secs);

    let api = api::build_router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(move |req: Request, next: Next| async move {
            match tokio::time::timeout(timeout, next.run(req)).await {
                Ok(res) => res,
                Err(_) => (
                    StatusCode::REQUEST_TIMEOUT,
                    Json(json!({ "message": "Request timed out." })),
                )
                    .into_response(),
            }
        }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.server)),
        )
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(name: "server.cors.invalid_origin", origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use lyricshare::AppState;
use lyricshare::config::{
    AppConfig, PersistenceConfig, PersistenceProviderKind, ResilienceConfig, RuntimeEnvironment,
    SecurityConfig, ServerConfig, TelemetryConfig,
};
use lyricshare::domain::Role;
use lyricshare::persistence::{PersistenceLayer, providers::memory::MemoryProvider};
use lyricshare::security::{TokenService, TokenSettings};
use lyricshare::server::build_router;
use serde_json::{Value, json};

pub const TEST_SECRET: &str = "integration-test-secret-integration-test-secret";
pub const PASSWORD: &str = "secret1";

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: RuntimeEnvironment::Production,
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        },
        security: SecurityConfig {
            jwt_secret: Some(TEST_SECRET.to_string()),
            jwt_issuer: "LyricShare".to_string(),
            jwt_audience: "LyricShareClient".to_string(),
            token_validity_minutes: 60,
        },
        resilience: ResilienceConfig {
            rate_limit_enabled: false,
            requests_per_second: 20,
            burst_size: 40,
            request_timeout_secs: 30,
        },
        persistence: PersistenceConfig {
            provider: PersistenceProviderKind::Memory,
            database_url: None,
            max_connections: 1,
        },
        telemetry: TelemetryConfig { json: false },
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let settings = TokenSettings::from_config(&config.security, config.environment).unwrap();
        let tokens = Arc::new(TokenService::new(settings));
        let persistence: Arc<dyn PersistenceLayer> = Arc::new(MemoryProvider::new());
        let state = AppState::new(Arc::new(config), persistence, tokens);
        let server = TestServer::new(build_router(state.clone())).unwrap();
        Self { server, state }
    }

    /// Register `email` and return the session token.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "firstName": "First",
                "lastName": "Last",
            }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    /// Register `email`, grant Admin directly in the store, and log in again
    /// so the token carries the new role.
    pub async fn register_admin(&self, email: &str) -> String {
        self.register(email).await;
        let user = self
            .state
            .persistence
            .find_user_by_email(email)
            .await
            .unwrap()
            .unwrap();
        assert!(
            self.state
                .persistence
                .set_user_roles(user.id, &[Role::User, Role::Admin])
                .await
                .unwrap()
        );
        self.login(email).await
    }

    pub async fn user_id(&self, email: &str) -> i64 {
        self.state
            .persistence
            .find_user_by_email(email)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Publish a song as the token's owner and return its id.
    pub async fn create_song(&self, token: &str, title: &str) -> i64 {
        let response = self
            .server
            .post("/api/songlyrics")
            .authorization_bearer(token)
            .json(&json!({ "title": title, "artist": "Artist", "content": "La la la" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }
}

/// Decode the payload segment of a compact JWT without verifying it.
pub fn decode_payload(token: &str) -> Value {
    let payload = token.split('.').nth(1).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

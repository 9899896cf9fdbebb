use axum::{Router, extract::State, routing::post};

use crate::AppState;
use crate::api::extract::Json;
use crate::accounts::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::ApiError;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// POST /register - Create an account and sign it in
#[tracing::instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.accounts.register(request).await?))
}

/// POST /login - Exchange credentials for a session token
#[tracing::instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.accounts.login(request).await?))
}

//! Admin-only dashboard and moderation.
//!
//! The whole router sits behind [`require_admin`]; handlers below do not
//! repeat the role check.

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{delete, get, put},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::extract::{Json, Path};
use crate::domain::{PopularSong, Role, UserSummary};
use crate::error::ApiError;
use crate::security::middleware::require_admin;

use super::RECENT_LIMIT;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatsResponse {
    pub total_users: i64,
    pub total_songs: i64,
    pub total_comments: i64,
    pub total_likes: i64,
    pub recent_signups: Vec<UserSummary>,
    pub popular_songs: Vec<PopularSong>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(system_stats))
        .route("/users", get(list_users))
        .route("/users/{id}/roles", put(update_user_roles))
        .route("/songs/{id}", delete(delete_song))
        .route("/comments/{id}", delete(delete_comment))
        .route_layer(middleware::from_fn(require_admin))
}

/// GET /stats - Site totals, newest signups and most-liked songs
#[tracing::instrument(skip_all)]
async fn system_stats(State(state): State<AppState>) -> Result<Json<SystemStatsResponse>, ApiError> {
    let counts = state.persistence.system_counts().await?;
    Ok(Json(SystemStatsResponse {
        total_users: counts.total_users,
        total_songs: counts.total_songs,
        total_comments: counts.total_comments,
        total_likes: counts.total_likes,
        recent_signups: state.persistence.recent_users(RECENT_LIMIT).await?,
        popular_songs: state.persistence.popular_songs(RECENT_LIMIT).await?,
    }))
}

/// GET /users - Every account, oldest first
#[tracing::instrument(skip_all)]
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    Ok(Json(state.persistence.list_users().await?))
}

/// PUT /users/{id}/roles - Replace a user's role set
#[tracing::instrument(skip(state, request))]
async fn update_user_roles(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRolesRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut roles = Vec::with_capacity(request.roles.len());
    for name in &request.roles {
        let role = name
            .parse::<Role>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    if !state.persistence.set_user_roles(id, &roles).await? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(name: "admin.roles.updated", user_id = id, roles = ?roles, "User roles replaced");
    Ok(Json(MessageResponse { message: "User roles updated successfully." }))
}

/// DELETE /songs/{id}
#[tracing::instrument(skip(state))]
async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.persistence.delete_song(id).await? {
        return Err(ApiError::not_found("Song lyric"));
    }
    tracing::info!(name: "admin.song.deleted", song_id = id, "Song lyric removed by admin");
    Ok(Json(MessageResponse { message: "Song lyric deleted successfully." }))
}

/// DELETE /comments/{id}
#[tracing::instrument(skip(state))]
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.persistence.delete_comment(id).await? {
        return Err(ApiError::not_found("Comment"));
    }
    tracing::info!(name: "admin.comment.deleted", comment_id = id, "Comment removed by admin");
    Ok(Json(MessageResponse { message: "Comment deleted successfully." }))
}

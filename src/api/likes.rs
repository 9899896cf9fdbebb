use axum::{
    Router,
    extract::State,
    routing::get,
};
use serde::Serialize;

use crate::AppState;
use crate::api::extract::{Json, Path};
use crate::domain::LikeView;
use crate::error::ApiError;
use crate::security::Principal;

#[derive(Debug, Serialize)]
pub struct ToggleLikeResponse {
    pub message: &'static str,
    pub liked: bool,
}

/// Mounted at `/songlyrics/{song_id}/likes`.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_likes).post(toggle_like))
        .route("/count", get(count_likes))
        .route("/check", get(check_like))
}

/// GET / - Who liked a song, newest first
#[tracing::instrument(skip(state))]
async fn list_likes(
    State(state): State<AppState>,
    Path(song_id): Path<i64>,
) -> Result<Json<Vec<LikeView>>, ApiError> {
    Ok(Json(state.persistence.list_likes_for_song(song_id).await?))
}

/// GET /count
#[tracing::instrument(skip(state))]
async fn count_likes(
    State(state): State<AppState>,
    Path(song_id): Path<i64>,
) -> Result<Json<i64>, ApiError> {
    Ok(Json(state.persistence.count_likes(song_id).await?))
}

/// POST / - Like the song, or take the like back
#[tracing::instrument(skip(state, principal), fields(user_id = principal.user_id))]
async fn toggle_like(
    State(state): State<AppState>,
    principal: Principal,
    Path(song_id): Path<i64>,
) -> Result<Json<ToggleLikeResponse>, ApiError> {
    if state.persistence.get_song(song_id).await?.is_none() {
        return Err(ApiError::not_found("Song lyric"));
    }

    let liked = state.persistence.toggle_like(principal.user_id, song_id).await?;
    let message = if liked { "Like added." } else { "Like removed." };
    Ok(Json(ToggleLikeResponse { message, liked }))
}

/// GET /check - Whether the caller likes this song
#[tracing::instrument(skip(state, principal), fields(user_id = principal.user_id))]
async fn check_like(
    State(state): State<AppState>,
    principal: Principal,
    Path(song_id): Path<i64>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.persistence.has_liked(principal.user_id, song_id).await?))
}

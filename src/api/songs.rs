//! Song lyric CRUD.
//!
//! Reads are open to everyone; a signed-in caller additionally sees whether
//! they liked each song. Writes require a session, and edits are limited to
//! the author or an Admin.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::extract::{Json, Path};
use crate::domain::{NewSong, SongLyric, SongUpdate, SongView};
use crate::error::ApiError;
use crate::security::Principal;
use crate::validation::{MAX_ARTIST_LEN, MAX_TITLE_LEN, Validator};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub content: String,
}

impl SongRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .required("title", &self.title)
            .max_len("title", self.title.trim(), MAX_TITLE_LEN)
            .required("artist", &self.artist)
            .max_len("artist", self.artist.trim(), MAX_ARTIST_LEN)
            .required("content", &self.content)
            .finish()
    }
}

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_songs).post(create_song))
        .route(
            "/{song_id}",
            get(get_song).put(update_song).delete(delete_song),
        )
}

/// Fetch a song the caller is about to change, enforcing ownership.
async fn load_owned_song(
    state: &AppState,
    principal: &Principal,
    id: i64,
) -> Result<SongLyric, ApiError> {
    let song = state
        .persistence
        .get_song(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Song lyric"))?;
    if !principal.can_modify(song.user_id) {
        tracing::info!(
            name: "songs.modify.denied",
            user_id = principal.user_id,
            song_id = id,
            "Caller is neither author nor admin"
        );
        return Err(ApiError::Forbidden);
    }
    Ok(song)
}

// =============================================================================
// Handlers
// =============================================================================

/// GET / - All songs, newest first
#[tracing::instrument(skip_all)]
async fn list_songs(
    State(state): State<AppState>,
    principal: Option<Principal>,
) -> Result<Json<Vec<SongView>>, ApiError> {
    let viewer = principal.map(|p| p.user_id);
    Ok(Json(state.persistence.list_song_views(viewer).await?))
}

/// GET /{song_id}
#[tracing::instrument(skip(state, principal))]
async fn get_song(
    State(state): State<AppState>,
    principal: Option<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<SongView>, ApiError> {
    let viewer = principal.map(|p| p.user_id);
    let song = state
        .persistence
        .get_song_view(id, viewer)
        .await?
        .ok_or_else(|| ApiError::not_found("Song lyric"))?;
    Ok(Json(song))
}

/// POST / - Publish a song as the caller
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn create_song(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<SongRequest>,
) -> Result<(StatusCode, Json<SongView>), ApiError> {
    request.validate()?;

    let song = state
        .persistence
        .create_song(&NewSong {
            title: request.title.trim().to_string(),
            artist: request.artist.trim().to_string(),
            content: request.content,
            user_id: principal.user_id,
        })
        .await?;

    let view = state
        .persistence
        .get_song_view(song.id, Some(principal.user_id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("song {} vanished after insert", song.id))?;

    tracing::info!(name: "songs.created", song_id = song.id, "Song lyric created");
    Ok((StatusCode::CREATED, Json(view)))
}

/// PUT /{song_id}
#[tracing::instrument(skip(state, principal, request), fields(user_id = principal.user_id))]
async fn update_song(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(request): Json<SongRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    load_owned_song(&state, &principal, id).await?;

    let update = SongUpdate {
        title: request.title.trim().to_string(),
        artist: request.artist.trim().to_string(),
        content: request.content,
    };
    if !state.persistence.update_song(id, &update).await? {
        return Err(ApiError::not_found("Song lyric"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /{song_id}
#[tracing::instrument(skip(state, principal), fields(user_id = principal.user_id))]
async fn delete_song(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    load_owned_song(&state, &principal, id).await?;
    state.persistence.delete_song(id).await?;
    tracing::info!(name: "songs.deleted", song_id = id, "Song lyric deleted");
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;

use crate::AppState;
use crate::api::extract::{Json, Path};
use crate::domain::{Comment, CommentView, NewComment};
use crate::error::ApiError;
use crate::security::Principal;
use crate::validation::{MAX_COMMENT_LEN, Validator};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

impl CommentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .required("text", &self.text)
            .max_len("text", self.text.trim(), MAX_COMMENT_LEN)
            .finish()
    }
}

/// Mounted at `/songlyrics/{song_id}/comments`.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route("/{comment_id}", put(update_comment).delete(delete_comment))
}

/// Load a comment for modification: it must exist, belong to `song_id`,
/// and be the caller's own unless the caller is an Admin.
async fn load_owned_comment(
    state: &AppState,
    principal: &Principal,
    song_id: i64,
    comment_id: i64,
) -> Result<Comment, ApiError> {
    let comment = state
        .persistence
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment"))?;
    if comment.song_id != song_id {
        return Err(ApiError::BadRequest(
            "Comment does not belong to this song lyric.".to_string(),
        ));
    }
    if !principal.can_modify(comment.user_id) {
        return Err(ApiError::Forbidden);
    }
    Ok(comment)
}

/// GET / - Comments on a song, newest first
#[tracing::instrument(skip(state))]
async fn list_comments(
    State(state): State<AppState>,
    Path(song_id): Path<i64>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    Ok(Json(state.persistence.list_comments_for_song(song_id).await?))
}

/// POST / - Comment on a song as the caller
#[tracing::instrument(skip(state, principal, request), fields(user_id = principal.user_id))]
async fn create_comment(
    State(state): State<AppState>,
    principal: Principal,
    Path(song_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    request.validate()?;

    if state.persistence.get_song(song_id).await?.is_none() {
        return Err(ApiError::not_found("Song lyric"));
    }

    let comment = state
        .persistence
        .create_comment(&NewComment {
            text: request.text.trim().to_string(),
            song_id,
            user_id: principal.user_id,
        })
        .await?;

    let view = state
        .persistence
        .get_comment_view(comment.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("comment {} vanished after insert", comment.id))?;

    tracing::info!(name: "comments.created", comment_id = comment.id, "Comment created");
    Ok((StatusCode::CREATED, Json(view)))
}

/// PUT /{comment_id}
#[tracing::instrument(skip(state, principal, request), fields(user_id = principal.user_id))]
async fn update_comment(
    State(state): State<AppState>,
    principal: Principal,
    Path((song_id, comment_id)): Path<(i64, i64)>,
    Json(request): Json<CommentRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    load_owned_comment(&state, &principal, song_id, comment_id).await?;

    if !state
        .persistence
        .update_comment_text(comment_id, request.text.trim())
        .await?
    {
        return Err(ApiError::not_found("Comment"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /{comment_id}
#[tracing::instrument(skip(state, principal), fields(user_id = principal.user_id))]
async fn delete_comment(
    State(state): State<AppState>,
    principal: Principal,
    Path((song_id, comment_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    load_owned_comment(&state, &principal, song_id, comment_id).await?;
    state.persistence.delete_comment(comment_id).await?;
    tracing::info!(name: "comments.deleted", comment_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

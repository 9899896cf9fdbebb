//! The caller's own profile under `/me`, and read-only views of other users.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::extract::{Json, Path};
use crate::accounts::{ChangePasswordRequest, DeleteAccountRequest};
use crate::domain::{CommentActivity, LikeActivity, Role, SongActivity, User, UserSongSummary, UserStats};
use crate::error::ApiError;
use crate::security::Principal;
use crate::validation::{MAX_NAME_LEN, Validator};

use super::RECENT_LIMIT;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
            roles: user.roles,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub recent_songs: Vec<SongActivity>,
    pub recent_comments: Vec<CommentActivity>,
    pub recent_likes: Vec<LikeActivity>,
}

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_my_profile).put(update_my_profile).delete(delete_my_account))
        .route("/me/changepassword", put(change_password))
        .route("/me/songlyrics", get(my_songs))
        .route("/me/stats", get(my_stats))
        .route("/me/activity", get(my_activity))
        .route("/{id}", get(get_profile))
        .route("/{id}/songlyrics", get(user_songs))
        .route("/{id}/stats", get(user_stats))
        .route("/{id}/activity", get(user_activity))
}

// =============================================================================
// Shared lookups
// =============================================================================

async fn load_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    state
        .persistence
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

async fn activity(state: &AppState, user_id: i64) -> Result<ActivityResponse, ApiError> {
    Ok(ActivityResponse {
        recent_songs: state.persistence.recent_songs_by_user(user_id, RECENT_LIMIT).await?,
        recent_comments: state
            .persistence
            .recent_comments_by_user(user_id, RECENT_LIMIT)
            .await?,
        recent_likes: state.persistence.recent_likes_by_user(user_id, RECENT_LIMIT).await?,
    })
}

// =============================================================================
// /me
// =============================================================================

/// GET /me
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn get_my_profile(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ProfileResponse>, ApiError> {
    // A token can outlive its account; treat that as unauthenticated.
    let user = state
        .persistence
        .find_user_by_id(principal.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user.into()))
}

/// PUT /me - Change display names
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn update_my_profile(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<StatusCode, ApiError> {
    let first_name = request.first_name.trim();
    let last_name = request.last_name.trim();
    Validator::new()
        .required("firstName", first_name)
        .max_len("firstName", first_name, MAX_NAME_LEN)
        .required("lastName", last_name)
        .max_len("lastName", last_name, MAX_NAME_LEN)
        .finish()?;

    if !state
        .persistence
        .update_user_names(principal.user_id, first_name, last_name)
        .await?
    {
        return Err(ApiError::Unauthorized);
    }
    tracing::info!(name: "profiles.updated", user_id = principal.user_id, "Profile updated");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /me - Close the caller's account
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn delete_my_account(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<DeleteAccountRequest>,
) -> Result<StatusCode, ApiError> {
    state.accounts.delete_account(&principal, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /me/changepassword
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn change_password(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state.accounts.change_password(&principal, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /me/songlyrics
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn my_songs(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<UserSongSummary>>, ApiError> {
    Ok(Json(state.persistence.list_songs_by_user(principal.user_id).await?))
}

/// GET /me/stats
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn my_stats(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.persistence.user_stats(principal.user_id).await?))
}

/// GET /me/activity
#[tracing::instrument(skip_all, fields(user_id = principal.user_id))]
async fn my_activity(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ActivityResponse>, ApiError> {
    Ok(Json(activity(&state, principal.user_id).await?))
}

// =============================================================================
// /{id}
// =============================================================================

/// GET /{id}
#[tracing::instrument(skip(state, _principal))]
async fn get_profile(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(load_user(&state, id).await?.into()))
}

/// GET /{id}/songlyrics
#[tracing::instrument(skip(state, _principal))]
async fn user_songs(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Vec<UserSongSummary>>, ApiError> {
    load_user(&state, id).await?;
    Ok(Json(state.persistence.list_songs_by_user(id).await?))
}

/// GET /{id}/stats
#[tracing::instrument(skip(state, _principal))]
async fn user_stats(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<UserStats>, ApiError> {
    load_user(&state, id).await?;
    Ok(Json(state.persistence.user_stats(id).await?))
}

/// GET /{id}/activity
#[tracing::instrument(skip(state, _principal))]
async fn user_activity(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<ActivityResponse>, ApiError> {
    load_user(&state, id).await?;
    Ok(Json(activity(&state, id).await?))
}

//! HTTP surface under `/api`.
//!
//! Each submodule exposes a `build_router()` over [`AppState`]. Identity
//! comes from the auth gate layered in [`crate::server::build_router`];
//! handlers opt in by extracting [`crate::security::Principal`].

use axum::Router;

use crate::AppState;

pub mod admin;
pub mod auth;
pub mod comments;
pub mod extract;
pub mod likes;
pub mod profiles;
pub mod songs;

/// Maximum entries in each activity and dashboard list.
pub const RECENT_LIMIT: usize = 5;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::build_router())
        .nest("/songlyrics", songs::build_router())
        .nest("/songlyrics/{song_id}/comments", comments::build_router())
        .nest("/songlyrics/{song_id}/likes", likes::build_router())
        .nest("/profiles", profiles::build_router())
        .nest("/admin", admin::build_router())
}

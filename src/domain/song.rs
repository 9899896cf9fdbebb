use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SongLyric {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub content: String,
    pub user_id: i64,
}

#[derive(Debug, Clone)]
pub struct SongUpdate {
    pub title: String,
    pub artist: String,
    pub content: String,
}

/// A song joined with its author and engagement counts, as seen by one viewer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SongView {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_email: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub has_liked: bool,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSongSummary {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PopularSong {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SongActivity {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

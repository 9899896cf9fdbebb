use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LikeView {
    #[serde(rename = "songLyricId")]
    pub song_id: i64,
    pub user_id: i64,
    pub user_first_name: String,
    pub user_last_name: String,
    pub liked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LikeActivity {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub song_title: String,
}

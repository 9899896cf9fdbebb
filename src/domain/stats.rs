use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_song_lyrics: i64,
    pub total_likes_received: i64,
    pub total_comments_received: i64,
    pub total_comments_written: i64,
    pub total_likes_given: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemCounts {
    pub total_users: i64,
    pub total_songs: i64,
    pub total_comments: i64,
    pub total_likes: i64,
}

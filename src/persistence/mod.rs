use crate::domain::{
    Comment, CommentActivity, CommentView, LikeActivity, LikeView, NewComment, NewSong, NewUser,
    PopularSong, Role, SongActivity, SongLyric, SongUpdate, SongView, SystemCounts, User,
    UserSongSummary, UserStats, UserSummary,
};
use async_trait::async_trait;

pub mod providers;

/// Entity name reported when a write targets a song lyric that is gone.
pub const SONG_ENTITY: &str = "Song lyric";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A uniqueness constraint rejected the write. Carries the offending field.
    #[error("duplicate value for {0}")]
    UniqueViolation(String),

    /// The row a write points at is gone. Carries the missing entity's name.
    #[error("{0} does not exist")]
    MissingReference(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Explicit query functions over users, songs, comments and likes.
///
/// Every method returns plain rows or pre-joined views. Mutations that may
/// race (`create_user`, `toggle_like`) are resolved inside the store.
#[async_trait]
pub trait PersistenceLayer: Send + Sync + std::fmt::Debug {
    // =========================================================================
    // Users & Roles
    // =========================================================================

    /// Insert a user and its roles. Fails with `UniqueViolation("email")`
    /// when the email (compared case-insensitively) is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// All users, oldest first, with their roles and song counts.
    async fn list_users(&self) -> Result<Vec<UserSummary>>;

    /// Newest signups first.
    async fn recent_users(&self, limit: usize) -> Result<Vec<UserSummary>>;

    /// Returns `false` when the user does not exist.
    async fn update_user_names(&self, id: i64, first_name: &str, last_name: &str)
    -> Result<bool>;

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool>;

    /// Replace the user's role set. Returns `false` when the user does not exist.
    async fn set_user_roles(&self, id: i64, roles: &[Role]) -> Result<bool>;

    /// Delete a user together with their songs, comments and likes.
    async fn delete_user(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Song Lyrics
    // =========================================================================

    async fn create_song(&self, song: &NewSong) -> Result<SongLyric>;
    async fn get_song(&self, id: i64) -> Result<Option<SongLyric>>;

    /// All songs newest first. `viewer` drives the `has_liked` flag.
    async fn list_song_views(&self, viewer: Option<i64>) -> Result<Vec<SongView>>;
    async fn get_song_view(&self, id: i64, viewer: Option<i64>) -> Result<Option<SongView>>;

    async fn update_song(&self, id: i64, update: &SongUpdate) -> Result<bool>;

    /// Delete a song together with its comments and likes.
    async fn delete_song(&self, id: i64) -> Result<bool>;

    async fn list_songs_by_user(&self, user_id: i64) -> Result<Vec<UserSongSummary>>;
    async fn recent_songs_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<SongActivity>>;

    /// Most-liked songs first.
    async fn popular_songs(&self, limit: usize) -> Result<Vec<PopularSong>>;

    // =========================================================================
    // Comments
    // =========================================================================

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    async fn get_comment_view(&self, id: i64) -> Result<Option<CommentView>>;

    /// Newest first.
    async fn list_comments_for_song(&self, song_id: i64) -> Result<Vec<CommentView>>;

    async fn update_comment_text(&self, id: i64, text: &str) -> Result<bool>;
    async fn delete_comment(&self, id: i64) -> Result<bool>;

    async fn recent_comments_by_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<CommentActivity>>;

    // =========================================================================
    // Likes
    // =========================================================================

    /// Add the like if absent, remove it if present. Returns the new state.
    async fn toggle_like(&self, user_id: i64, song_id: i64) -> Result<bool>;

    async fn has_liked(&self, user_id: i64, song_id: i64) -> Result<bool>;

    /// Newest first.
    async fn list_likes_for_song(&self, song_id: i64) -> Result<Vec<LikeView>>;
    async fn count_likes(&self, song_id: i64) -> Result<i64>;

    async fn recent_likes_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<LikeActivity>>;

    // =========================================================================
    // Statistics
    // =========================================================================

    async fn user_stats(&self, user_id: i64) -> Result<UserStats>;
    async fn system_counts(&self) -> Result<SystemCounts>;
}

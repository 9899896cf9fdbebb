//! In-process persistence used for local runs and the test suite.
//!
//! All state sits behind one `RwLock`, so every write (including the
//! email uniqueness check) is atomic with respect to other requests.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    Comment, CommentActivity, CommentView, LikeActivity, LikeView, NewComment, NewSong, NewUser,
    PopularSong, Role, SongActivity, SongLyric, SongUpdate, SongView, SystemCounts, User,
    UserSongSummary, UserStats, UserSummary,
};
use crate::persistence::{PersistenceError, PersistenceLayer, Result, SONG_ENTITY};

#[derive(Debug, Clone)]
struct LikeRecord {
    id: i64,
    user_id: i64,
    song_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    songs: BTreeMap<i64, SongLyric>,
    comments: BTreeMap<i64, Comment>,
    likes: BTreeMap<i64, LikeRecord>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        let wanted = email.trim().to_lowercase();
        self.users
            .values()
            .find(|u| u.email.to_lowercase() == wanted)
    }

    fn song_count(&self, user_id: i64) -> i64 {
        count(self.songs.values().filter(|s| s.user_id == user_id))
    }

    fn like_count(&self, song_id: i64) -> i64 {
        count(self.likes.values().filter(|l| l.song_id == song_id))
    }

    fn comment_count(&self, song_id: i64) -> i64 {
        count(self.comments.values().filter(|c| c.song_id == song_id))
    }

    fn summarize_user(&self, user: &User) -> UserSummary {
        UserSummary {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at,
            roles: user.roles.clone(),
            song_count: self.song_count(user.id),
        }
    }

    fn song_view(&self, song: &SongLyric, viewer: Option<i64>) -> Option<SongView> {
        let author = self.users.get(&song.user_id)?;
        Some(SongView {
            id: song.id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            content: song.content.clone(),
            created_at: song.created_at,
            updated_at: song.updated_at,
            author_first_name: author.first_name.clone(),
            author_last_name: author.last_name.clone(),
            author_email: author.email.clone(),
            like_count: self.like_count(song.id),
            comment_count: self.comment_count(song.id),
            has_liked: viewer.is_some_and(|v| {
                self.likes
                    .values()
                    .any(|l| l.song_id == song.id && l.user_id == v)
            }),
            user_id: song.user_id,
        })
    }

    fn comment_view(&self, comment: &Comment) -> Option<CommentView> {
        let author = self.users.get(&comment.user_id)?;
        Some(CommentView {
            id: comment.id,
            text: comment.text.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            song_id: comment.song_id,
            user_id: comment.user_id,
            user_first_name: author.first_name.clone(),
            user_last_name: author.last_name.clone(),
            user_email: author.email.clone(),
        })
    }

    fn remove_song_cascade(&mut self, song_id: i64) -> bool {
        if self.songs.remove(&song_id).is_none() {
            return false;
        }
        self.comments.retain(|_, c| c.song_id != song_id);
        self.likes.retain(|_, l| l.song_id != song_id);
        true
    }
}

fn count<I: Iterator>(iter: I) -> i64 {
    i64::try_from(iter.count()).unwrap_or(i64::MAX)
}

/// Newest first, ties broken by the higher id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by_key(|item| Reverse(key(item)));
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: RwLock<MemoryState>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceLayer for MemoryProvider {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.user_by_email(&user.email).is_some() {
            return Err(PersistenceError::UniqueViolation("email".to_string()));
        }
        let id = state.allocate_id();
        let mut roles = user.roles.clone();
        roles.sort();
        roles.dedup();
        let created = User {
            id,
            email: user.email.trim().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: user.password_hash.clone(),
            created_at: Utc::now(),
            updated_at: None,
            roles,
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.user_by_email(email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut users: Vec<_> = state.users.values().map(|u| state.summarize_user(u)).collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn recent_users(&self, limit: usize) -> Result<Vec<UserSummary>> {
        let state = self.state.read().await;
        let mut users: Vec<_> = state.users.values().map(|u| state.summarize_user(u)).collect();
        newest_first(&mut users, |u| (u.created_at, u.id));
        users.truncate(limit);
        Ok(users)
    }

    async fn update_user_names(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        user.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn set_user_roles(&self, id: i64, roles: &[Role]) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        let mut roles = roles.to_vec();
        roles.sort();
        roles.dedup();
        user.roles = roles;
        user.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned_songs: Vec<i64> = state
            .songs
            .values()
            .filter(|s| s.user_id == id)
            .map(|s| s.id)
            .collect();
        for song_id in owned_songs {
            state.remove_song_cascade(song_id);
        }
        state.comments.retain(|_, c| c.user_id != id);
        state.likes.retain(|_, l| l.user_id != id);
        Ok(true)
    }

    async fn create_song(&self, song: &NewSong) -> Result<SongLyric> {
        let mut state = self.state.write().await;
        let id = state.allocate_id();
        let created = SongLyric {
            id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            content: song.content.clone(),
            user_id: song.user_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.songs.insert(id, created.clone());
        Ok(created)
    }

    async fn get_song(&self, id: i64) -> Result<Option<SongLyric>> {
        Ok(self.state.read().await.songs.get(&id).cloned())
    }

    async fn list_song_views(&self, viewer: Option<i64>) -> Result<Vec<SongView>> {
        let state = self.state.read().await;
        let mut songs: Vec<_> = state
            .songs
            .values()
            .filter_map(|s| state.song_view(s, viewer))
            .collect();
        newest_first(&mut songs, |s| (s.created_at, s.id));
        Ok(songs)
    }

    async fn get_song_view(&self, id: i64, viewer: Option<i64>) -> Result<Option<SongView>> {
        let state = self.state.read().await;
        Ok(state.songs.get(&id).and_then(|s| state.song_view(s, viewer)))
    }

    async fn update_song(&self, id: i64, update: &SongUpdate) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(song) = state.songs.get_mut(&id) else {
            return Ok(false);
        };
        song.title = update.title.clone();
        song.artist = update.artist.clone();
        song.content = update.content.clone();
        song.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn delete_song(&self, id: i64) -> Result<bool> {
        Ok(self.state.write().await.remove_song_cascade(id))
    }

    async fn list_songs_by_user(&self, user_id: i64) -> Result<Vec<UserSongSummary>> {
        let state = self.state.read().await;
        let mut songs: Vec<_> = state
            .songs
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| UserSongSummary {
                id: s.id,
                title: s.title.clone(),
                artist: s.artist.clone(),
                created_at: s.created_at,
                like_count: state.like_count(s.id),
                comment_count: state.comment_count(s.id),
            })
            .collect();
        newest_first(&mut songs, |s| (s.created_at, s.id));
        Ok(songs)
    }

    async fn recent_songs_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<SongActivity>> {
        let state = self.state.read().await;
        let mut songs: Vec<_> = state
            .songs
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| SongActivity {
                id: s.id,
                title: s.title.clone(),
                created_at: s.created_at,
            })
            .collect();
        newest_first(&mut songs, |s| (s.created_at, s.id));
        songs.truncate(limit);
        Ok(songs)
    }

    async fn popular_songs(&self, limit: usize) -> Result<Vec<PopularSong>> {
        let state = self.state.read().await;
        let mut songs: Vec<_> = state
            .songs
            .values()
            .map(|s| PopularSong {
                id: s.id,
                title: s.title.clone(),
                artist: s.artist.clone(),
                like_count: state.like_count(s.id),
            })
            .collect();
        songs.sort_by_key(|s| (Reverse(s.like_count), s.id));
        songs.truncate(limit);
        Ok(songs)
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut state = self.state.write().await;
        if !state.songs.contains_key(&comment.song_id) {
            return Err(PersistenceError::MissingReference(SONG_ENTITY.to_string()));
        }
        let id = state.allocate_id();
        let created = Comment {
            id,
            text: comment.text.clone(),
            song_id: comment.song_id,
            user_id: comment.user_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn get_comment_view(&self, id: i64) -> Result<Option<CommentView>> {
        let state = self.state.read().await;
        Ok(state.comments.get(&id).and_then(|c| state.comment_view(c)))
    }

    async fn list_comments_for_song(&self, song_id: i64) -> Result<Vec<CommentView>> {
        let state = self.state.read().await;
        let mut comments: Vec<_> = state
            .comments
            .values()
            .filter(|c| c.song_id == song_id)
            .filter_map(|c| state.comment_view(c))
            .collect();
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn update_comment_text(&self, id: i64, text: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(comment) = state.comments.get_mut(&id) else {
            return Ok(false);
        };
        comment.text = text.to_string();
        comment.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        Ok(self.state.write().await.comments.remove(&id).is_some())
    }

    async fn recent_comments_by_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<CommentActivity>> {
        let state = self.state.read().await;
        let mut comments: Vec<_> = state
            .comments
            .values()
            .filter(|c| c.user_id == user_id)
            .filter_map(|c| {
                let song = state.songs.get(&c.song_id)?;
                Some(CommentActivity {
                    id: c.id,
                    text: c.text.clone(),
                    created_at: c.created_at,
                    song_title: song.title.clone(),
                })
            })
            .collect();
        newest_first(&mut comments, |c| (c.created_at, c.id));
        comments.truncate(limit);
        Ok(comments)
    }

    async fn toggle_like(&self, user_id: i64, song_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.songs.contains_key(&song_id) {
            return Err(PersistenceError::MissingReference(SONG_ENTITY.to_string()));
        }
        let existing = state
            .likes
            .values()
            .find(|l| l.user_id == user_id && l.song_id == song_id)
            .map(|l| l.id);
        if let Some(like_id) = existing {
            state.likes.remove(&like_id);
            return Ok(false);
        }
        let id = state.allocate_id();
        state.likes.insert(
            id,
            LikeRecord {
                id,
                user_id,
                song_id,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn has_liked(&self, user_id: i64, song_id: i64) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .likes
            .values()
            .any(|l| l.user_id == user_id && l.song_id == song_id))
    }

    async fn list_likes_for_song(&self, song_id: i64) -> Result<Vec<LikeView>> {
        let state = self.state.read().await;
        let mut likes: Vec<_> = state
            .likes
            .values()
            .filter(|l| l.song_id == song_id)
            .filter_map(|l| {
                let user = state.users.get(&l.user_id)?;
                Some((
                    l.id,
                    LikeView {
                        song_id: l.song_id,
                        user_id: l.user_id,
                        user_first_name: user.first_name.clone(),
                        user_last_name: user.last_name.clone(),
                        liked_at: l.created_at,
                    },
                ))
            })
            .collect();
        newest_first(&mut likes, |(id, l)| (l.liked_at, *id));
        Ok(likes.into_iter().map(|(_, l)| l).collect())
    }

    async fn count_likes(&self, song_id: i64) -> Result<i64> {
        Ok(self.state.read().await.like_count(song_id))
    }

    async fn recent_likes_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<LikeActivity>> {
        let state = self.state.read().await;
        let mut likes: Vec<_> = state
            .likes
            .values()
            .filter(|l| l.user_id == user_id)
            .filter_map(|l| {
                let song = state.songs.get(&l.song_id)?;
                Some(LikeActivity {
                    id: l.id,
                    created_at: l.created_at,
                    song_title: song.title.clone(),
                })
            })
            .collect();
        newest_first(&mut likes, |l| (l.created_at, l.id));
        likes.truncate(limit);
        Ok(likes)
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let state = self.state.read().await;
        let owned = |song_id: i64| {
            state
                .songs
                .get(&song_id)
                .is_some_and(|s| s.user_id == user_id)
        };
        Ok(UserStats {
            total_song_lyrics: state.song_count(user_id),
            total_likes_received: count(state.likes.values().filter(|l| owned(l.song_id))),
            total_comments_received: count(state.comments.values().filter(|c| owned(c.song_id))),
            total_comments_written: count(state.comments.values().filter(|c| c.user_id == user_id)),
            total_likes_given: count(state.likes.values().filter(|l| l.user_id == user_id)),
        })
    }

    async fn system_counts(&self) -> Result<SystemCounts> {
        let state = self.state.read().await;
        Ok(SystemCounts {
            total_users: count(state.users.values()),
            total_songs: count(state.songs.values()),
            total_comments: count(state.comments.values()),
            total_likes: count(state.likes.values()),
        })
    }
}

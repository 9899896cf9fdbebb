//! Plain data types shared by the persistence layer and the HTTP API.
//!
//! Rows (`User`, `SongLyric`, `Comment`) mirror stored records. Views
//! (`SongView`, `CommentView`, ...) are the joined, read-only shapes the
//! query functions return; nothing here loads related data lazily.

pub mod comment;
pub mod like;
pub mod role;
pub mod song;
pub mod stats;
pub mod user;

pub use comment::{Comment, CommentActivity, CommentView, NewComment};
pub use like::{LikeActivity, LikeView};
pub use role::{Role, UnknownRole};
pub use song::{NewSong, PopularSong, SongActivity, SongLyric, SongUpdate, SongView, UserSongSummary};
pub use stats::{SystemCounts, UserStats};
pub use user::{NewUser, User, UserSummary};

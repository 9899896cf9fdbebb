use crate::domain::{
    Comment, CommentActivity, CommentView, LikeActivity, LikeView, NewComment, NewSong, NewUser,
    PopularSong, Role, SongActivity, SongLyric, SongUpdate, SongView, SystemCounts, User,
    UserSongSummary, UserStats, UserSummary,
};
use crate::persistence::{PersistenceError, PersistenceLayer, Result, SONG_ENTITY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

const USER_COLUMNS: &str = r#"
    SELECT u.id, u.email, u.first_name, u.last_name, u.password_hash, u.created_at, u.updated_at,
           COALESCE(ARRAY_AGG(r.name ORDER BY r.id) FILTER (WHERE r.name IS NOT NULL), ARRAY[]::TEXT[]) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

const USER_SUMMARY_COLUMNS: &str = r#"
    SELECT u.id, u.email, u.first_name, u.last_name, u.created_at,
           COALESCE(ARRAY_AGG(r.name ORDER BY r.id) FILTER (WHERE r.name IS NOT NULL), ARRAY[]::TEXT[]) AS roles,
           (SELECT COUNT(*) FROM song_lyrics s WHERE s.user_id = u.id) AS song_count
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
    GROUP BY u.id
"#;

const SONG_VIEW_COLUMNS: &str = r#"
    SELECT s.id, s.title, s.artist, s.content, s.created_at, s.updated_at,
           u.first_name AS author_first_name, u.last_name AS author_last_name, u.email AS author_email,
           (SELECT COUNT(*) FROM likes l WHERE l.song_id = s.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.song_id = s.id) AS comment_count,
           EXISTS (SELECT 1 FROM likes l WHERE l.song_id = s.id AND l.user_id = $1) AS has_liked,
           s.user_id
    FROM song_lyrics s
    JOIN users u ON u.id = s.user_id
"#;

const COMMENT_VIEW_COLUMNS: &str = r#"
    SELECT c.id, c.text, c.created_at, c.updated_at, c.song_id, c.user_id,
           u.first_name AS user_first_name, u.last_name AS user_last_name, u.email AS user_email
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    roles: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserSummaryRow {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    roles: Vec<String>,
    song_count: i64,
}

fn parse_roles(names: Vec<String>) -> Result<Vec<Role>> {
    names
        .into_iter()
        .map(|name| {
            name.parse::<Role>()
                .map_err(|e| PersistenceError::Corrupt(e.to_string()))
        })
        .collect()
}

impl TryFrom<UserRow> for User {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
            roles: parse_roles(row.roles)?,
        })
    }
}

impl TryFrom<UserSummaryRow> for UserSummary {
    type Error = PersistenceError;

    fn try_from(row: UserSummaryRow) -> Result<Self> {
        Ok(UserSummary {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            roles: parse_roles(row.roles)?,
            song_count: row.song_count,
        })
    }
}

fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Map a unique-constraint failure onto `UniqueViolation(field)`.
fn unique_or_database(err: sqlx::Error, field: &str) -> PersistenceError {
    let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique {
        PersistenceError::UniqueViolation(field.to_string())
    } else {
        PersistenceError::Database(err)
    }
}

/// Map a foreign-key failure onto `MissingReference(entity)`.
fn missing_or_database(err: sqlx::Error, entity: &str) -> PersistenceError {
    let missing = matches!(&err, sqlx::Error::Database(db) if db.is_foreign_key_violation());
    if missing {
        PersistenceError::MissingReference(entity.to_string())
    } else {
        PersistenceError::Database(err)
    }
}

#[derive(Debug)]
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        // Run Migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl PersistenceLayer for PostgresProvider {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id
            "#,
        )
        .bind(user.email.trim())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_or_database(e, "email"))?;
        let id: i64 = row.try_get("id")?;

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, r.id FROM roles r WHERE r.name = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(role_names(&user.roles))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| PersistenceError::Corrupt(format!("user {id} vanished after insert")))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("{USER_COLUMNS} WHERE LOWER(u.email) = LOWER($1) GROUP BY u.id");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{USER_COLUMNS} WHERE u.id = $1 GROUP BY u.id");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let sql = format!("{USER_SUMMARY_COLUMNS} ORDER BY u.created_at ASC, u.id ASC");
        let rows = sqlx::query_as::<_, UserSummaryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(UserSummary::try_from).collect()
    }

    async fn recent_users(&self, limit: usize) -> Result<Vec<UserSummary>> {
        let sql = format!("{USER_SUMMARY_COLUMNS} ORDER BY u.created_at DESC, u.id DESC LIMIT $1");
        let rows = sqlx::query_as::<_, UserSummaryRow>(&sql)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(UserSummary::try_from).collect()
    }

    async fn update_user_names(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_roles(&self, id: i64, roles: &[Role]) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE users SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, r.id FROM roles r WHERE r.name = ANY($2)
            "#,
        )
        .bind(id)
        .bind(role_names(roles))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        // Songs, comments, likes and role links cascade.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_song(&self, song: &NewSong) -> Result<SongLyric> {
        let row = sqlx::query_as::<_, SongLyric>(
            r#"
            INSERT INTO song_lyrics (title, artist, content, user_id, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, title, artist, content, user_id, created_at, updated_at
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.content)
        .bind(song.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_song(&self, id: i64) -> Result<Option<SongLyric>> {
        let row = sqlx::query_as::<_, SongLyric>(
            "SELECT id, title, artist, content, user_id, created_at, updated_at FROM song_lyrics WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_song_views(&self, viewer: Option<i64>) -> Result<Vec<SongView>> {
        let sql = format!("{SONG_VIEW_COLUMNS} ORDER BY s.created_at DESC, s.id DESC");
        let rows = sqlx::query_as::<_, SongView>(&sql)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_song_view(&self, id: i64, viewer: Option<i64>) -> Result<Option<SongView>> {
        let sql = format!("{SONG_VIEW_COLUMNS} WHERE s.id = $2");
        let row = sqlx::query_as::<_, SongView>(&sql)
            .bind(viewer)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_song(&self, id: i64, update: &SongUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE song_lyrics
            SET title = $2, artist = $3, content = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.artist)
        .bind(&update.content)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_song(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM song_lyrics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_songs_by_user(&self, user_id: i64) -> Result<Vec<UserSongSummary>> {
        let rows = sqlx::query_as::<_, UserSongSummary>(
            r#"
            SELECT s.id, s.title, s.artist, s.created_at,
                   (SELECT COUNT(*) FROM likes l WHERE l.song_id = s.id) AS like_count,
                   (SELECT COUNT(*) FROM comments c WHERE c.song_id = s.id) AS comment_count
            FROM song_lyrics s
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC, s.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recent_songs_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<SongActivity>> {
        let rows = sqlx::query_as::<_, SongActivity>(
            r#"
            SELECT id, title, created_at FROM song_lyrics
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn popular_songs(&self, limit: usize) -> Result<Vec<PopularSong>> {
        let rows = sqlx::query_as::<_, PopularSong>(
            r#"
            SELECT s.id, s.title, s.artist, COUNT(l.id) AS like_count
            FROM song_lyrics s
            LEFT JOIN likes l ON l.song_id = s.id
            GROUP BY s.id
            ORDER BY like_count DESC, s.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (text, song_id, user_id, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, text, song_id, user_id, created_at, updated_at
            "#,
        )
        .bind(&comment.text)
        .bind(comment.song_id)
        .bind(comment.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_or_database(e, SONG_ENTITY))?;
        Ok(row)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, Comment>(
            "SELECT id, text, song_id, user_id, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_comment_view(&self, id: i64) -> Result<Option<CommentView>> {
        let sql = format!("{COMMENT_VIEW_COLUMNS} WHERE c.id = $1");
        let row = sqlx::query_as::<_, CommentView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_comments_for_song(&self, song_id: i64) -> Result<Vec<CommentView>> {
        let sql =
            format!("{COMMENT_VIEW_COLUMNS} WHERE c.song_id = $1 ORDER BY c.created_at DESC, c.id DESC");
        let rows = sqlx::query_as::<_, CommentView>(&sql)
            .bind(song_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_comment_text(&self, id: i64, text: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE comments SET text = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(text)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn recent_comments_by_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<CommentActivity>> {
        let rows = sqlx::query_as::<_, CommentActivity>(
            r#"
            SELECT c.id, c.text, c.created_at, s.title AS song_title
            FROM comments c
            JOIN song_lyrics s ON s.id = c.song_id
            WHERE c.user_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn toggle_like(&self, user_id: i64, song_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND song_id = $2")
            .bind(user_id)
            .bind(song_id)
            .execute(&mut *tx)
            .await?;

        let liked = if removed.rows_affected() > 0 {
            false
        } else {
            // A concurrent toggle may have inserted first; the pair stays liked either way.
            sqlx::query(
                r#"
                INSERT INTO likes (user_id, song_id, created_at) VALUES ($1, $2, NOW())
                ON CONFLICT (user_id, song_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(song_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| missing_or_database(e, SONG_ENTITY))?;
            true
        };

        tx.commit().await?;
        Ok(liked)
    }

    async fn has_liked(&self, user_id: i64, song_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = $1 AND song_id = $2) AS liked",
        )
        .bind(user_id)
        .bind(song_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("liked")?)
    }

    async fn list_likes_for_song(&self, song_id: i64) -> Result<Vec<LikeView>> {
        let rows = sqlx::query_as::<_, LikeView>(
            r#"
            SELECT l.song_id, l.user_id, u.first_name AS user_first_name,
                   u.last_name AS user_last_name, l.created_at AS liked_at
            FROM likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.song_id = $1
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_likes(&self, song_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM likes WHERE song_id = $1")
            .bind(song_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn recent_likes_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<LikeActivity>> {
        let rows = sqlx::query_as::<_, LikeActivity>(
            r#"
            SELECT l.id, l.created_at, s.title AS song_title
            FROM likes l
            JOIN song_lyrics s ON s.id = l.song_id
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM song_lyrics WHERE user_id = $1) AS total_song_lyrics,
                (SELECT COUNT(*) FROM likes l JOIN song_lyrics s ON s.id = l.song_id
                    WHERE s.user_id = $1) AS total_likes_received,
                (SELECT COUNT(*) FROM comments c JOIN song_lyrics s ON s.id = c.song_id
                    WHERE s.user_id = $1) AS total_comments_received,
                (SELECT COUNT(*) FROM comments WHERE user_id = $1) AS total_comments_written,
                (SELECT COUNT(*) FROM likes WHERE user_id = $1) AS total_likes_given
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            total_song_lyrics: row.try_get("total_song_lyrics")?,
            total_likes_received: row.try_get("total_likes_received")?,
            total_comments_received: row.try_get("total_comments_received")?,
            total_comments_written: row.try_get("total_comments_written")?,
            total_likes_given: row.try_get("total_likes_given")?,
        })
    }

    async fn system_counts(&self) -> Result<SystemCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM song_lyrics) AS total_songs,
                (SELECT COUNT(*) FROM comments) AS total_comments,
                (SELECT COUNT(*) FROM likes) AS total_likes
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SystemCounts {
            total_users: row.try_get("total_users")?,
            total_songs: row.try_get("total_songs")?,
            total_comments: row.try_get("total_comments")?,
            total_likes: row.try_get("total_likes")?,
        })
    }
}

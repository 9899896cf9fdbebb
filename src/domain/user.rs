use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Role;

/// A registered account as held by the credential store.
///
/// `password_hash` is an argon2 PHC string and is never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub roles: Vec<Role>,
}

impl User {
    /// The login name. Accounts sign in with their email address.
    pub fn username(&self) -> &str {
        &self.email
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Admin listing row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
    pub song_count: i64,
}

use serde::{Deserialize, Serialize};

use crate::domain::Role;

/// Payload of a session token.
///
/// `nameid` repeats the subject for clients that read the user id from the
/// name-identifier claim rather than `sub`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub jti: String,
    pub email: String,
    pub nameid: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub username: String,
    #[serde(rename = "role", default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// The validated identity for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Authors may modify their own content. Admins may modify anything.
    pub fn can_modify(&self, owner_id: i64) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

//! Registration, login and credential management.
//!
//! [`AccountService`] owns every path that touches a password. Handlers pass
//! it request bodies and a [`Principal`]; it answers with domain results or
//! an [`ApiError`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{NewUser, Role};
use crate::error::ApiError;
use crate::persistence::{PersistenceError, PersistenceLayer};
use crate::security::password::{hash_password, verify_against_dummy, verify_password};
use crate::security::{Principal, TokenService};
use crate::validation::{MAX_NAME_LEN, MIN_PASSWORD_LEN, Validator};

pub const EMAIL_IN_USE_MESSAGE: &str = "Email is already in use.";
pub const REGISTERED_MESSAGE: &str = "User registered successfully.";
pub const LOGGED_IN_MESSAGE: &str = "Login successful.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expiration: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug)]
pub struct AccountService {
    persistence: Arc<dyn PersistenceLayer>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(persistence: Arc<dyn PersistenceLayer>, tokens: Arc<TokenService>) -> Self {
        Self { persistence, tokens }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        let email = request.email.trim();
        let first_name = request.first_name.trim();
        let last_name = request.last_name.trim();

        Validator::new()
            .required("email", email)
            .email("email", email)
            .required("password", &request.password)
            .min_len("password", &request.password, MIN_PASSWORD_LEN)
            .required("firstName", first_name)
            .max_len("firstName", first_name, MAX_NAME_LEN)
            .required("lastName", last_name)
            .max_len("lastName", last_name, MAX_NAME_LEN)
            .finish()?;

        if self.persistence.find_user_by_email(email).await?.is_some() {
            tracing::info!(name: "auth.register.duplicate", "Registration rejected: email already in use");
            return Err(ApiError::Conflict(EMAIL_IN_USE_MESSAGE.to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let new_user = NewUser {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password_hash,
            roles: vec![Role::User],
        };

        // A concurrent registration can still win between the lookup and the insert.
        let user = match self.persistence.create_user(&new_user).await {
            Ok(user) => user,
            Err(PersistenceError::UniqueViolation(_)) => {
                tracing::info!(name: "auth.register.duplicate", "Registration lost a race on email");
                return Err(ApiError::Conflict(EMAIL_IN_USE_MESSAGE.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let issued = self.tokens.issue(&user)?;
        tracing::info!(name: "auth.register.succeeded", user_id = user.id, "User registered");

        Ok(AuthResponse {
            token: issued.token,
            expiration: issued.expires_at,
            message: REGISTERED_MESSAGE.to_string(),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        let email = request.email.trim();
        Validator::new()
            .required("email", email)
            .required("password", &request.password)
            .finish()?;

        let Some(user) = self.persistence.find_user_by_email(email).await? else {
            verify_against_dummy(&request.password);
            tracing::info!(name: "auth.login.failed", reason = "unknown_email", "Login failed");
            return Err(ApiError::InvalidCredentials);
        };

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::info!(name: "auth.login.failed", reason = "wrong_password", user_id = user.id, "Login failed");
            return Err(ApiError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&user)?;
        tracing::info!(name: "auth.login.succeeded", user_id = user.id, "User logged in");

        Ok(AuthResponse {
            token: issued.token,
            expiration: issued.expires_at,
            message: LOGGED_IN_MESSAGE.to_string(),
        })
    }

    pub async fn change_password(
        &self,
        principal: &Principal,
        request: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        Validator::new()
            .required("currentPassword", &request.current_password)
            .required("newPassword", &request.new_password)
            .min_len("newPassword", &request.new_password, MIN_PASSWORD_LEN)
            .finish()?;

        let user = self
            .persistence
            .find_user_by_id(principal.user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !verify_password(&request.current_password, &user.password_hash)? {
            return Err(ApiError::BadRequest("Current password is incorrect.".to_string()));
        }

        let password_hash = hash_password(&request.new_password)?;
        self.persistence.update_password_hash(user.id, &password_hash).await?;
        tracing::info!(name: "auth.password.changed", user_id = user.id, "Password changed");
        Ok(())
    }

    /// Remove the caller's account and everything they authored.
    pub async fn delete_account(
        &self,
        principal: &Principal,
        request: DeleteAccountRequest,
    ) -> Result<(), ApiError> {
        Validator::new().required("password", &request.password).finish()?;

        let user = self
            .persistence
            .find_user_by_id(principal.user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(ApiError::BadRequest("Password is incorrect.".to_string()));
        }

        self.persistence.delete_user(user.id).await?;
        tracing::info!(name: "auth.account.deleted", user_id = user.id, "Account deleted");
        Ok(())
    }
}

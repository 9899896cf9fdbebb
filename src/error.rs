//! Boundary error type for HTTP handlers.
//!
//! Every handler returns `Result<_, ApiError>`. Lower layers raise their own
//! typed errors ([`PersistenceError`], [`TokenError`], [`PasswordError`]),
//! which are folded in here and rendered as a JSON `{ "message": .. }` body.
//! Internal failures are logged in full and surfaced only as a generic message.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::persistence::PersistenceError;
use crate::security::password::PasswordError;
use crate::security::token::TokenError;

pub const UNAUTHORIZED_MESSAGE: &str = "Authentication is required.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// Field name to the list of problems found with it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed, expired or tampered credentials.
    #[error("unauthenticated")]
    Unauthorized,

    /// Login failure. Deliberately identical for unknown email and wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("rate limit exceeded")]
    TooManyRequests,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found."))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match &self {
            Self::Validation(errors) => ("One or more validation errors occurred.", Some(errors)),
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Conflict(msg) => {
                (msg.as_str(), None)
            }
            Self::Unauthorized => (UNAUTHORIZED_MESSAGE, None),
            Self::InvalidCredentials => (INVALID_CREDENTIALS_MESSAGE, None),
            Self::Forbidden => (FORBIDDEN_MESSAGE, None),
            Self::TooManyRequests => ("Too many requests.", None),
            Self::Internal(err) => {
                tracing::error!(name: "api.internal_error", error = ?err, "Unhandled error while serving request");
                (SERVER_ERROR_MESSAGE, None)
            }
        };
        (status, Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::UniqueViolation(what) => {
                Self::Conflict(format!("A record with this {what} already exists."))
            }
            PersistenceError::MissingReference(what) => Self::not_found(&what),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => Self::Unauthorized,
            other => Self::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(name: "api.body_rejected", error = %rejection.body_text());
        match rejection {
            JsonRejection::JsonDataError(_) => Self::Validation(FieldErrors::from([(
                "body".to_string(),
                vec!["The request body contains a field of the wrong type.".to_string()],
            )])),
            JsonRejection::MissingJsonContentType(_) => {
                Self::BadRequest("Expected a JSON request body.".into())
            }
            _ => Self::BadRequest("The request body is not valid JSON.".into()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(name: "api.path_rejected", error = %rejection.body_text());
        Self::BadRequest("Invalid route parameter.".into())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Validation(FieldErrors::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("Song").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err: ApiError = PersistenceError::UniqueViolation("email".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn missing_reference_becomes_not_found() {
        let err: ApiError = PersistenceError::MissingReference("Song lyric".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(matches!(err, ApiError::NotFound(msg) if msg == "Song lyric not found."));
    }

    #[tokio::test]
    async fn json_type_mismatch_is_a_validation_error() {
        let request = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"email": 5}"#))
            .unwrap();
        let rejection = <Json<RegisterShape> as axum::extract::FromRequest<()>>::from_request(request, &())
            .await
            .unwrap_err();
        let err = ApiError::from(rejection);
        assert!(matches!(&err, ApiError::Validation(errors) if errors.contains_key("body")));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct RegisterShape {
        email: String,
    }

    #[tokio::test]
    async fn internal_error_body_hides_detail() {
        let response = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], SERVER_ERROR_MESSAGE);
        assert!(!bytes.windows(7).any(|w| w == b"refused"));
    }
}

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::domain::Role;
use crate::error::ApiError;

use super::claims::Principal;

/// Resolve the caller's identity from the `Authorization` header.
///
/// No header: the request continues anonymously. A header that is not a
/// bearer token, or a token that fails validation, ends the request with 401.
/// A valid token attaches a [`Principal`] to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(header_value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = header_value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let principal = state.tokens.validate(token).map_err(|e| {
        tracing::debug!(name: "security.auth.rejected", error = %e, "Rejected bearer token");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Require `role` of the caller. Anonymous callers get 401, others lacking
/// the role get 403.
pub fn authorize(principal: Option<&Principal>, role: Role) -> Result<(), ApiError> {
    match principal {
        None => Err(ApiError::Unauthorized),
        Some(p) if p.has_role(role) => Ok(()),
        Some(p) => {
            tracing::info!(
                name: "security.authorize.denied",
                user_id = p.user_id,
                required = %role,
                "Caller lacks required role"
            );
            Err(ApiError::Forbidden)
        }
    }
}

/// Route layer for the admin surface. Must sit inside [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    authorize(request.extensions().get::<Principal>(), Role::Admin)?;
    Ok(next.run(request).await)
}

/// Extracting `Principal` makes a handler require authentication.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// `Option<Principal>` serves anonymous-friendly handlers.
impl<S> OptionalFromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Principal>().cloned())
    }
}

//! Credentials, session tokens and request guards.
//!
//! - [`password`]: argon2id hashing and constant-time verification
//! - [`token`]: signing and validating HS256 session tokens
//! - [`claims`]: the token payload and the per-request [`claims::Principal`]
//! - [`middleware`]: the auth gate and role guards
//! - [`rate_limit`]: global request throttling

pub mod claims;
pub mod middleware;
pub mod password;
pub mod rate_limit;
pub mod token;

pub use claims::{Principal, SessionClaims};
pub use token::{IssuedToken, TokenError, TokenService, TokenSettings};

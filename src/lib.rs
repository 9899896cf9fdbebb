//! LyricShare backend
//!
//! A lyrics sharing service: accounts sign in with email and password and
//! receive a short-lived signed session token, then publish song lyrics,
//! comment on them and like them.
//!
//! # Modules
//!
//! - [`security`]: password hashing, session tokens, the auth gate and role guards
//! - [`accounts`]: registration, login and credential changes
//! - [`api`]: the HTTP handlers under `/api`
//! - [`persistence`]: the store trait with Postgres and in-memory providers
//! - [`config`]: layered configuration (defaults, file, env, CLI)

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod accounts;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod security;
pub mod server;
pub mod telemetry;
pub mod validation;

use std::sync::Arc;

use crate::accounts::AccountService;
use crate::config::AppConfig;
use crate::persistence::PersistenceLayer;
use crate::security::TokenService;
use crate::security::rate_limit::AppRateLimiter;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Users, songs, comments and likes.
    pub persistence: Arc<dyn PersistenceLayer>,
    /// Issues and validates session tokens.
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AccountService>,
    /// Global Rate Limiter
    pub rate_limiter: Arc<AppRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        persistence: Arc<dyn PersistenceLayer>,
        tokens: Arc<TokenService>,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(
            Arc::clone(&persistence),
            Arc::clone(&tokens),
        ));
        let rate_limiter = Arc::new(AppRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ));
        Self {
            persistence,
            tokens,
            accounts,
            rate_limiter,
            config,
        }
    }
}

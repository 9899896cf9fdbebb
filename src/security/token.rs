//! Session token issuance and validation.
//!
//! Tokens are compact HS256 JWTs signed with a secret shared by issuer and
//! validator. They carry the user's identity and roles, expire after a fixed
//! window, and are never stored server-side: expiry is the only way a token
//! stops working.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::config::{RuntimeEnvironment, SecurityConfig};
use crate::domain::{Role, User};

use super::claims::{Principal, SessionClaims};

/// Signing secret used only when running in development without `JWT_SECRET`.
pub const DEVELOPMENT_SECRET: &str = "lyricshare-development-only-signing-secret-do-not-deploy";

/// Shorter secrets still work but are logged as weak.
pub const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT secret is not configured. Set the JWT_SECRET environment variable.")]
    MissingSecret,

    #[error("token validity must be positive, got {0} minutes")]
    InvalidValidity(i64),

    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),

    /// Bad signature, wrong issuer/audience, expired, or malformed.
    #[error("token rejected: {0}")]
    Invalid(String),
}

/// Everything needed to sign and verify tokens, resolved once at startup.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub validity: Duration,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("validity", &self.validity)
            .finish()
    }
}

impl TokenSettings {
    /// Resolve the signing secret. A missing secret is fatal in production;
    /// development falls back to [`DEVELOPMENT_SECRET`] with a warning.
    pub fn from_config(
        security: &SecurityConfig,
        environment: RuntimeEnvironment,
    ) -> Result<Self, TokenError> {
        let configured = security
            .jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let secret = match configured {
            Some(secret) => secret.to_string(),
            None if environment.is_development() => {
                tracing::warn!(
                    name: "security.jwt.insecure_fallback",
                    "JWT_SECRET is not set; using the built-in development secret. This is not secure for production."
                );
                DEVELOPMENT_SECRET.to_string()
            }
            None => return Err(TokenError::MissingSecret),
        };

        if secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                name: "security.jwt.weak_secret",
                length = secret.len(),
                "JWT secret is shorter than {RECOMMENDED_SECRET_LEN} characters. Consider a longer secret."
            );
        }

        if security.token_validity_minutes <= 0 {
            return Err(TokenError::InvalidValidity(security.token_validity_minutes));
        }

        Ok(Self {
            secret,
            issuer: security.jwt_issuer.clone(),
            audience: security.jwt_audience.clone(),
            validity: Duration::minutes(security.token_validity_minutes),
        })
    }
}

/// A freshly signed token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    issuer: String,
    audience: String,
    validity: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            issuer: settings.issuer,
            audience: settings.audience,
            validity: settings.validity,
            validation,
        }
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Sign a token for `user` as if issued at `issued_at`.
    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at + self.validity;
        let user_id = user.id.to_string();
        let claims = SessionClaims {
            sub: user_id.clone(),
            jti: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            nameid: user_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username().to_string(),
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, issuer, audience and expiry, then build the principal.
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        let claims = data.claims;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::Invalid(format!("non-numeric subject {:?}", claims.sub)))?;

        // Unknown role names are dropped rather than trusted.
        let roles = claims
            .roles
            .iter()
            .filter_map(|r| r.parse::<Role>().ok())
            .collect();

        Ok(Principal {
            user_id,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    fn settings(secret: &str) -> TokenSettings {
        TokenSettings {
            secret: secret.to_string(),
            issuer: "LyricShare".to_string(),
            audience: "LyricShareClient".to_string(),
            validity: Duration::minutes(60),
        }
    }

    fn service() -> TokenService {
        TokenService::new(settings("unit-test-secret-that-is-long-enough-0123"))
    }

    fn user(roles: Vec<Role>) -> User {
        User {
            id: 42,
            email: "a@x.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: None,
            roles,
        }
    }

    fn security_config(secret: Option<&str>) -> SecurityConfig {
        SecurityConfig {
            jwt_secret: secret.map(str::to_string),
            jwt_issuer: "LyricShare".to_string(),
            jwt_audience: "LyricShareClient".to_string(),
            token_validity_minutes: 60,
        }
    }

    fn payload(token: &str) -> serde_json::Value {
        let part = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
    }

    #[test]
    fn token_is_three_part_and_carries_identity() {
        let issued = service().issue(&user(vec![Role::User])).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);

        let claims = payload(&issued.token);
        assert_eq!(claims["sub"], "42");
        assert_eq!(claims["nameid"], "42");
        assert_eq!(claims["email"], "a@x.com");
        assert_eq!(claims["username"], "a@x.com");
        assert_eq!(claims["firstName"], "A");
        assert_eq!(claims["lastName"], "B");
        assert_eq!(claims["role"], serde_json::json!(["User"]));
        assert_eq!(claims["iss"], "LyricShare");
        assert_eq!(claims["aud"], "LyricShareClient");
        assert_eq!(
            claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
            3600
        );
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let svc = service();
        let u = user(vec![Role::User]);
        let a = payload(&svc.issue(&u).unwrap().token);
        let b = payload(&svc.issue(&u).unwrap().token);
        assert_ne!(a["jti"], b["jti"]);
    }

    #[test]
    fn validate_roundtrip_builds_principal() {
        let svc = service();
        let issued = svc.issue(&user(vec![Role::User, Role::Admin])).unwrap();
        let principal = svc.validate(&issued.token).unwrap();
        assert_eq!(principal.user_id, 42);
        assert_eq!(principal.email, "a@x.com");
        assert!(principal.is_admin());
        assert!(principal.has_role(Role::User));
    }

    #[test]
    fn accepted_at_59_minutes_rejected_at_61() {
        let svc = service();
        let u = user(vec![Role::User]);

        let issued_59_ago = svc.issue_at(&u, Utc::now() - Duration::minutes(59)).unwrap();
        assert!(svc.validate(&issued_59_ago.token).is_ok());

        let issued_61_ago = svc.issue_at(&u, Utc::now() - Duration::minutes(61)).unwrap();
        assert!(matches!(
            svc.validate(&issued_61_ago.token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn any_altered_signature_character_is_rejected() {
        let svc = service();
        let token = svc.issue(&user(vec![Role::User])).unwrap().token;
        let (unsigned, signature) = token.rsplit_once('.').unwrap();

        for i in 0..signature.len() {
            let mut sig: Vec<char> = signature.chars().collect();
            sig[i] = if sig[i] == 'A' { 'B' } else { 'A' };
            let tampered = format!("{unsigned}.{}", sig.iter().collect::<String>());
            assert!(svc.validate(&tampered).is_err(), "position {i} accepted");
        }
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = service();
        let token = svc.issue(&user(vec![Role::User])).unwrap().token;
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims = payload(&token);
        claims["role"] = serde_json::json!(["User", "Admin"]);
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert!(svc.validate(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_issuer_or_audience_is_rejected() {
        let token = service().issue(&user(vec![Role::User])).unwrap().token;

        let other_secret = TokenService::new(settings("a-completely-different-secret-value-xyz"));
        assert!(other_secret.validate(&token).is_err());

        let mut other_issuer = settings("unit-test-secret-that-is-long-enough-0123");
        other_issuer.issuer = "SomeoneElse".to_string();
        assert!(TokenService::new(other_issuer).validate(&token).is_err());

        let mut other_audience = settings("unit-test-secret-that-is-long-enough-0123");
        other_audience.audience = "OtherClient".to_string();
        assert!(TokenService::new(other_audience).validate(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().validate("not.a.token").is_err());
        assert!(service().validate("").is_err());
    }

    #[test]
    fn missing_secret_is_fatal_in_production() {
        let result = TokenSettings::from_config(&security_config(None), RuntimeEnvironment::Production);
        assert!(matches!(result, Err(TokenError::MissingSecret)));

        let blank =
            TokenSettings::from_config(&security_config(Some("   ")), RuntimeEnvironment::Production);
        assert!(matches!(blank, Err(TokenError::MissingSecret)));
    }

    #[test]
    fn development_falls_back_to_builtin_secret() {
        let settings =
            TokenSettings::from_config(&security_config(None), RuntimeEnvironment::Development)
                .unwrap();
        assert_eq!(settings.secret, DEVELOPMENT_SECRET);
    }

    #[test]
    fn configured_secret_wins_in_every_environment() {
        let settings = TokenSettings::from_config(
            &security_config(Some("configured-secret-configured-secret-1")),
            RuntimeEnvironment::Development,
        )
        .unwrap();
        assert_eq!(settings.secret, "configured-secret-configured-secret-1");
        assert_eq!(settings.validity, Duration::minutes(60));
    }
}

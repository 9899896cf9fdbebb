use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Config file picked up from the working directory when no path is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Runtime environment (development | production)
    #[arg(long, env = "APP_ENV")]
    pub environment: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Symmetric secret used to sign and verify session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Persistence provider (postgres | memory)
    #[arg(long, env = "PERSISTENCE_PROVIDER")]
    pub persistence_provider: Option<String>,

    /// Database connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    Development,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: RuntimeEnvironment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub resilience: ResilienceConfig,
    pub persistence: PersistenceConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Origins allowed by CORS. Empty means no cross-origin access.
    pub cors_origins: Vec<String>,
}

#[derive(Deserialize, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_validity_minutes: i64,
}

// Hand-written so the secret never reaches a log line.
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("token_validity_minutes", &self.token_validity_minutes)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceProviderKind {
    Postgres,
    Memory,
}

#[derive(Deserialize, Clone)]
pub struct PersistenceConfig {
    pub provider: PersistenceProviderKind,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl std::fmt::Debug for PersistenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceConfig")
            .field("provider", &self.provider)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of the compact human format.
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest to highest priority: defaults, config file,
    /// `LYRICSHARE_*` environment, CLI flags (and their env aliases).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("environment", "production")?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.cors_origins", vec!["http://localhost:3000"])?
            .set_default("security.jwt_issuer", "LyricShare")?
            .set_default("security.jwt_audience", "LyricShareClient")?
            .set_default("security.token_validity_minutes", 60)?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.requests_per_second", 20)?
            .set_default("resilience.burst_size", 40)?
            .set_default("resilience.request_timeout_secs", 30)?
            .set_default("persistence.provider", "postgres")?
            .set_default("persistence.max_connections", 5)?
            .set_default("telemetry.json", false)?;

        match &cli.config {
            Some(path) => {
                builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder
                    .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));
            }
            None => {}
        }

        // E.g. LYRICSHARE_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("LYRICSHARE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        if let Some(env) = cli.environment {
            builder = builder.set_override("environment", env.to_lowercase())?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(secret) = cli.jwt_secret.filter(|s| !s.trim().is_empty()) {
            builder = builder.set_override("security.jwt_secret", secret)?;
        }
        if let Some(provider) = cli.persistence_provider {
            builder = builder.set_override("persistence.provider", provider.to_lowercase())?;
        }
        if let Some(url) = cli.database_url {
            builder = builder.set_override("persistence.database_url", url)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.security.token_validity_minutes <= 0 {
            return Err(config::ConfigError::Message(
                "security.token_validity_minutes must be positive".to_string(),
            ));
        }
        if self.resilience.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "resilience.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.persistence.provider == PersistenceProviderKind::Postgres
            && self.persistence.database_url.is_none()
        {
            return Err(config::ConfigError::Message(
                "persistence.database_url is required for the postgres provider".to_string(),
            ));
        }
        Ok(())
    }
}

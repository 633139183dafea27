use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Shared JWT secret verified by every app on the domain
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Session lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    /// JWT issuer claim
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience claim
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Name of the session cookie shared across subdomains
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Cookie domain (e.g., ".nubras.com") so sibling apps see the session
    #[serde(default)]
    pub session_cookie_domain: Option<String>,

    /// Base URL used when building magic links (the auth front-end)
    #[serde(default = "default_magic_link_base_url")]
    pub magic_link_base_url: String,

    /// Magic-link token lifetime in seconds
    #[serde(default = "default_magic_link_expiration_secs")]
    pub magic_link_expiration_secs: u64,

    /// Outbound mail delivery endpoint; unset falls back to log-only delivery
    #[serde(default)]
    pub mail_endpoint: Option<String>,

    /// From address stamped on outbound mail
    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Currency applied when a request does not name one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_jwt_expiration() -> u64 {
    3600
}
fn default_auth_issuer() -> String {
    "nubras-auth".to_string()
}
fn default_auth_audience() -> String {
    "nubras-apps".to_string()
}
fn default_session_cookie_name() -> String {
    "nubras-session".to_string()
}
fn default_magic_link_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_magic_link_expiration_secs() -> u64 {
    900
}
fn default_mail_from() -> String {
    "no-reply@nubras.com".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_currency() -> String {
    "AED".to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_event_channel_capacity() -> usize {
    1024
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let lowered = secret.to_ascii_lowercase();
    if lowered.contains("changeme") || lowered == "secret" {
        return Err(ValidationError::new("jwt_secret_placeholder"));
    }
    Ok(())
}

impl AppConfig {
    /// Construct a configuration directly; used by tests and tooling.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        jwt_expiration: u64,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            session_cookie_name: default_session_cookie_name(),
            session_cookie_domain: None,
            magic_link_base_url: default_magic_link_base_url(),
            magic_link_expiration_secs: default_magic_link_expiration_secs(),
            mail_endpoint: None,
            mail_from: default_mail_from(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            default_currency: default_currency(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment.as_str(), "development" | "dev" | "test")
    }

    /// Permissive CORS is only acceptable in development or with an explicit override.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Session cookies are marked Secure everywhere except development.
    pub fn cookie_secure(&self) -> bool {
        !self.is_development()
    }

    /// Non-development deployments must either name their origins or opt in
    /// to the permissive fallback explicitly.
    pub fn validate_additional_constraints(&self) -> Result<(), ConfigValidationError> {
        if !self.is_development()
            && self.cors_allowed_origins.is_none()
            && !self.cors_allow_any_origin
        {
            return Err(ConfigValidationError::MissingCorsOrigins);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("cors_allowed_origins must be set (or cors_allow_any_origin enabled) outside development")]
    MissingCorsOrigins,
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Constraint(#[from] ConfigValidationError),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("nubras_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default: it MUST come from the environment or a
    // config file so insecure placeholders never reach production.
    let config = Config::builder()
        .set_default("database_url", "sqlite://nubras.db?mode=rwc")?
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a secure random string (minimum 32 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {}", e);
        AppConfigError::Constraint(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(environment: &str) -> AppConfig {
        AppConfig::new(
            "sqlite::memory:",
            "a_sufficiently_long_testing_secret_0123456789",
            3600,
            "127.0.0.1",
            8080,
            environment,
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config("production");
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config("production");
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_is_permissive() {
        let cfg = base_config("development");
        assert!(cfg.validate_additional_constraints().is_ok());
        assert!(cfg.should_allow_permissive_cors());
        assert!(!cfg.cookie_secure());
    }

    #[test]
    fn placeholder_secrets_fail_validation() {
        let mut cfg = base_config("development");
        cfg.jwt_secret = "changeme_changeme_changeme_changeme".into();
        assert!(cfg.validate().is_err());
    }
}

//! Quire Configuration Management
//!
//! Configuration is read from a TOML file holding one table per profile
//! (`[debug]`, `[release]`), then overridden by environment variables.
//! Every field has a development default so a missing file still yields a
//! runnable server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Document store connection
    pub database: DatabaseConfig,

    /// Token signing and lifetimes
    pub auth: AuthConfig,

    /// Field length limits for user input
    pub limits: LimitsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load one profile from a TOML file
    pub fn from_file(path: impl Into<PathBuf>, profile: Profile) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content, profile).map_err(|message| ConfigError::ParseError {
            path,
            message,
        })
    }

    fn from_toml_str(content: &str, profile: Profile) -> Result<Self, String> {
        let profiles: ProfileFile = toml::from_str(content).map_err(|e| e.to_string())?;

        Ok(match profile {
            Profile::Debug => profiles.debug,
            Profile::Release => profiles.release,
        })
    }

    /// Apply environment variables (env takes precedence over file values)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("API_PORT")? {
            self.server.port = port;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = split_origins(&origins);
        }

        // SurrealDB
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            self.database.surrealdb_url = url;
        }
        if let Ok(user) = std::env::var("SURREALDB_USER") {
            self.database.surrealdb_user = user;
        }
        if let Ok(pass) = std::env::var("SURREALDB_PASS") {
            self.database.surrealdb_pass = pass;
        }

        // Tokens
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(mins) = parse_env("JWT_ACCESS_TTL_MINS")? {
            self.auth.access_ttl_mins = mins;
        }
        if let Some(mins) = parse_env("JWT_REFRESH_TTL_MINS")? {
            self.auth.refresh_ttl_mins = mins;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self, profile: Profile) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if profile == Profile::Release && self.auth.jwt_secret == AuthConfig::DEV_SECRET {
            return Err(ConfigError::InvalidValue {
                key: "auth.jwt_secret".to_string(),
                value: "<development default>".to_string(),
            });
        }
        if self.auth.access_ttl_mins == 0 || self.auth.refresh_ttl_mins == 0 {
            return Err(ConfigError::InvalidValue {
                key: "auth.*_ttl_mins".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// On-disk layout: one full configuration per profile
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileFile {
    debug: AppConfig,
    release: AppConfig,
}

/// Configuration profile selected at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Debug,
    Release,
}

impl std::str::FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            _ => Err(ConfigError::InvalidValue {
                key: "profile".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS (empty allows any origin)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_origins: vec![],
        }
    }
}

/// SurrealDB connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SurrealDB WebSocket URL
    pub surrealdb_url: String,

    /// SurrealDB username
    pub surrealdb_user: String,

    /// SurrealDB password
    pub surrealdb_pass: String,

    /// SurrealDB namespace
    pub surrealdb_namespace: String,

    /// SurrealDB database name
    pub surrealdb_database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            surrealdb_url: "ws://localhost:8000".to_string(),
            surrealdb_user: "root".to_string(),
            surrealdb_pass: "root".to_string(),
            surrealdb_namespace: "quire".to_string(),
            surrealdb_database: "content".to_string(),
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret shared by access and refresh tokens
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_mins: u64,

    /// Refresh session lifetime in minutes
    pub refresh_ttl_mins: u64,

    /// Value of the `iss` claim
    pub issuer: String,
}

impl AuthConfig {
    pub const DEV_SECRET: &'static str = "development-secret-key-change-in-production";
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Self::DEV_SECRET.to_string(),
            access_ttl_mins: 30,
            refresh_ttl_mins: 24 * 60,
            issuer: "quire".to_string(),
        }
    }
}

/// Inclusive character-count bounds for a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Whether `value` has between `min` and `max` characters
    pub fn contains(&self, value: &str) -> bool {
        let len = value.chars().count();
        len >= self.min && len <= self.max
    }
}

/// Field length limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub first_name: LengthBounds,
    pub last_name: LengthBounds,
    pub nickname: LengthBounds,
    pub password: LengthBounds,
    pub article_id: LengthBounds,
    pub article_name: LengthBounds,
    /// Upper bound for `count` in paginated article queries
    pub find_max_count: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            first_name: LengthBounds::new(2, 32),
            last_name: LengthBounds::new(2, 32),
            nickname: LengthBounds::new(2, 16),
            password: LengthBounds::new(8, 128),
            article_id: LengthBounds::new(2, 64),
            article_name: LengthBounds::new(2, 128),
            find_max_count: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "quire_api=debug,tower_http=debug".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.access_ttl_mins, 30);
        assert_eq!(config.auth.refresh_ttl_mins, 1440);
        assert_eq!(config.limits.nickname, LengthBounds::new(2, 16));
        assert!(config.validate(Profile::Debug).is_ok());
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("debug".parse::<Profile>().unwrap(), Profile::Debug);
        assert_eq!("RELEASE".parse::<Profile>().unwrap(), Profile::Release);
        assert!("staging".parse::<Profile>().is_err());
    }

    #[test]
    fn test_profiles_from_toml() {
        let content = r#"
            [debug.server]
            port = 9000

            [release.server]
            port = 80

            [release.auth]
            jwt_secret = "a-real-secret"
            access_ttl_mins = 15
        "#;

        let debug = AppConfig::from_toml_str(content, Profile::Debug).unwrap();
        assert_eq!(debug.server.port, 9000);
        assert_eq!(debug.auth.jwt_secret, AuthConfig::DEV_SECRET);

        let release = AppConfig::from_toml_str(content, Profile::Release).unwrap();
        assert_eq!(release.server.port, 80);
        assert_eq!(release.server.host, "0.0.0.0");
        assert_eq!(release.auth.access_ttl_mins, 15);
        assert_eq!(release.auth.refresh_ttl_mins, 1440);
        assert!(release.validate(Profile::Release).is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[debug.limits]\nfind_max_count = 10").unwrap();

        let config = AppConfig::from_file(file.path(), Profile::Debug).unwrap();
        assert_eq!(config.limits.find_max_count, 10);
        assert_eq!(config.limits.password, LengthBounds::new(8, 128));
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file("/nonexistent/quire.toml", Profile::Debug);
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }

    #[test]
    fn test_release_rejects_dev_secret() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(Profile::Release),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_length_bounds_count_characters() {
        let bounds = LengthBounds::new(2, 4);
        assert!(!bounds.contains("a"));
        assert!(bounds.contains("ab"));
        assert!(bounds.contains("абвг"));
        assert!(!bounds.contains("abcde"));
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins("https://a.com, https://b.com,,"),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
    }
}

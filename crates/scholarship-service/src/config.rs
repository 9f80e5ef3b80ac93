//! Scholarship service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default maximum database connections.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Maximum session lifetime in hours (30 days).
pub const MAX_SESSION_TTL_HOURS: i64 = 720;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum accepted bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum accepted bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default directory for uploaded documents.
pub const DEFAULT_STORAGE_DIR: &str = "./data/uploads";

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Hard ceiling for `MAX_UPLOAD_BYTES` (50 MiB).
pub const MAX_UPLOAD_BYTES_CEILING: usize = 50 * 1024 * 1024;

/// Default interval between expired-session sweeps.
pub const DEFAULT_SESSION_CLEANUP_INTERVAL_SECONDS: u64 = 300;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Scholarship service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum connections in the database pool.
    pub db_max_connections: u32,

    /// Session lifetime in hours.
    pub session_ttl_hours: i64,

    /// Bcrypt cost factor for password hashing.
    pub bcrypt_cost: u32,

    /// Root directory of the local file store.
    pub storage_dir: PathBuf,

    /// Maximum accepted document size in bytes.
    pub max_upload_bytes: usize,

    /// Seconds between expired-session sweeps.
    pub session_cleanup_interval_seconds: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("db_max_connections", &self.db_max_connections)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("storage_dir", &self.storage_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field(
                "session_cleanup_interval_seconds",
                &self.session_cleanup_interval_seconds,
            )
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let db_max_connections = parse_var(vars, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        if db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "must be greater than 0"));
        }

        let session_ttl_hours = parse_var(vars, "SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(invalid(
                "SESSION_TTL_HOURS",
                &format!(
                    "must be between 1 and {}, got {}",
                    MAX_SESSION_TTL_HOURS, session_ttl_hours
                ),
            ));
        }

        let bcrypt_cost = parse_var(vars, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(invalid(
                "BCRYPT_COST",
                &format!(
                    "must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, bcrypt_cost
                ),
            ));
        }

        let storage_dir = vars
            .get("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        let max_upload_bytes = parse_var(vars, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        if max_upload_bytes == 0 || max_upload_bytes > MAX_UPLOAD_BYTES_CEILING {
            return Err(invalid(
                "MAX_UPLOAD_BYTES",
                &format!(
                    "must be between 1 and {}, got {}",
                    MAX_UPLOAD_BYTES_CEILING, max_upload_bytes
                ),
            ));
        }

        let session_cleanup_interval_seconds = parse_var(
            vars,
            "SESSION_CLEANUP_INTERVAL_SECONDS",
            DEFAULT_SESSION_CLEANUP_INTERVAL_SECONDS,
        )?;
        if session_cleanup_interval_seconds == 0 {
            return Err(invalid(
                "SESSION_CLEANUP_INTERVAL_SECONDS",
                "must be greater than 0",
            ));
        }

        let log_format = match vars.get("LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(invalid(
                    "LOG_FORMAT",
                    &format!("must be 'text' or 'json', got '{}'", other),
                ))
            }
        };

        Ok(Config {
            database_url,
            bind_address,
            db_max_connections,
            session_ttl_hours,
            bcrypt_cost,
            storage_dir,
            max_upload_bytes,
            session_cleanup_interval_seconds,
            log_format,
        })
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name) {
        Some(value) => value.parse().map_err(|e: T::Err| {
            invalid(
                name,
                &format!("must be a valid integer, got '{}': {}", value, e),
            )
        }),
        None => Ok(default),
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "DATABASE_URL".to_string(),
            "postgresql://localhost/scholarship".to_string(),
        )])
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.session_cleanup_interval_seconds, 300);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_missing_database_url() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("SESSION_TTL_HOURS".to_string(), "8".to_string());
        vars.insert("BCRYPT_COST".to_string(), "10".to_string());
        vars.insert("STORAGE_DIR".to_string(), "/srv/uploads".to_string());
        vars.insert("MAX_UPLOAD_BYTES".to_string(), "2048".to_string());
        vars.insert("LOG_FORMAT".to_string(), "json".to_string());

        let config = Config::from_vars(&vars).expect("Config should load");
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.session_ttl_hours, 8);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.storage_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bcrypt_cost_out_of_range() {
        for cost in ["4", "9", "15", "31"] {
            let mut vars = base_vars();
            vars.insert("BCRYPT_COST".to_string(), cost.to_string());
            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { ref name, .. }) if name == "BCRYPT_COST"),
                "cost {} should be rejected",
                cost
            );
        }
    }

    #[test]
    fn test_session_ttl_bounds() {
        let mut vars = base_vars();
        vars.insert("SESSION_TTL_HOURS".to_string(), "0".to_string());
        assert!(Config::from_vars(&vars).is_err());

        vars.insert("SESSION_TTL_HOURS".to_string(), "721".to_string());
        assert!(Config::from_vars(&vars).is_err());

        vars.insert("SESSION_TTL_HOURS".to_string(), "720".to_string());
        assert!(Config::from_vars(&vars).is_ok());
    }

    #[test]
    fn test_non_numeric_value() {
        let mut vars = base_vars();
        vars.insert("DB_MAX_CONNECTIONS".to_string(), "many".to_string());
        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { name, reason })
                if name == "DB_MAX_CONNECTIONS" && reason.contains("'many'"))
        );
    }

    #[test]
    fn test_upload_limit_ceiling() {
        let mut vars = base_vars();
        vars.insert(
            "MAX_UPLOAD_BYTES".to_string(),
            (MAX_UPLOAD_BYTES_CEILING + 1).to_string(),
        );
        assert!(Config::from_vars(&vars).is_err());

        vars.insert("MAX_UPLOAD_BYTES".to_string(), "0".to_string());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut vars = base_vars();
        vars.insert("LOG_FORMAT".to_string(), "yaml".to_string());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let mut vars = base_vars();
        vars.insert(
            "DATABASE_URL".to_string(),
            "postgresql://admin:secret@db/scholarship".to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret@db"));
    }
}

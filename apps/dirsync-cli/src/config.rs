//! Environment configuration.
//!
//! Every section reads through a lookup function so tests can supply
//! variables without touching the process environment.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use dirsync_connector_ldap::LdapConfig;
use dirsync_reconcile::ReconcileConfig;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human readable.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("expected 'json' or 'pretty', got '{other}'")),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` does not parse.
    pub filter: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Load from the process environment.
    ///
    /// - `RUST_LOG` - Log level filter (default: "info")
    /// - `LOG_FORMAT` - `json` or `pretty` (default: "json")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Json)?,
        })
    }
}

/// Database settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"***REDACTED***")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl DatabaseConfig {
    /// Load from the process environment.
    ///
    /// - `DATABASE_URL` - PostgreSQL connection string (required)
    /// - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 4, minimum 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: required(&lookup, "DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 4)?,
        })
    }
}

/// Directory settings, read into an [`LdapConfig`].
///
/// - `LDAP_HOST`, `LDAP_BASE_DN`, `LDAP_BIND_DN` (required)
/// - `LDAP_BIND_PASSWORD`, `LDAP_GROUP_CONTAINER` (optional)
/// - `LDAP_PORT`, `LDAP_USE_SSL`, `LDAP_USE_STARTTLS`, `LDAP_GROUP_FILTER`,
///   `LDAP_ID_ATTRIBUTE`, `LDAP_ACCOUNT_ATTRIBUTE`, `LDAP_PAGE_SIZE`,
///   `LDAP_TIMEOUT_SECS` (defaulted)
/// - `LDAP_ID_ATTRIBUTE_BINARY` (default: true for objectGUID-style attributes)
pub fn ldap_config_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<LdapConfig, ConfigError> {
    let mut config = LdapConfig::new(
        required(&lookup, "LDAP_HOST")?,
        required(&lookup, "LDAP_BASE_DN")?,
        required(&lookup, "LDAP_BIND_DN")?,
    );

    if parse_or(&lookup, "LDAP_USE_SSL", false)? {
        config = config.with_ssl();
    }
    config.use_starttls = parse_or(&lookup, "LDAP_USE_STARTTLS", false)?;
    config.port = parse_or(&lookup, "LDAP_PORT", config.port)?;
    config.bind_password = lookup("LDAP_BIND_PASSWORD");
    config.group_container = lookup("LDAP_GROUP_CONTAINER").filter(|s| !s.is_empty());
    if let Some(filter) = lookup("LDAP_GROUP_FILTER") {
        config.group_filter = filter;
    }
    if let Some(attribute) = lookup("LDAP_ID_ATTRIBUTE") {
        config = config.with_id_attribute(attribute);
    }
    config.id_attribute_binary =
        parse_or(&lookup, "LDAP_ID_ATTRIBUTE_BINARY", config.id_attribute_binary)?;
    if let Some(attribute) = lookup("LDAP_ACCOUNT_ATTRIBUTE") {
        config.account_attribute = attribute;
    }
    config.page_size = parse_or(&lookup, "LDAP_PAGE_SIZE", config.page_size)?;
    config.connection_timeout_secs =
        parse_or(&lookup, "LDAP_TIMEOUT_SECS", config.connection_timeout_secs)?;

    config.validate().map_err(|e| ConfigError::InvalidValue {
        var: "LDAP_*".to_string(),
        message: e.to_string(),
    })?;

    Ok(config)
}

/// Run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Delete managed groups missing from the directory.
    pub destructive: bool,
    pub reconcile: ReconcileConfig,
}

impl RunConfig {
    /// - `DIRSYNC_DESTRUCTIVE` (default: false)
    /// - `DIRSYNC_MAX_RUN_SECS` (optional)
    /// - `DIRSYNC_VERIFY_MAPPINGS` (default: true)
    /// - `DIRSYNC_PROGRESS_INTERVAL` (default: 500)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ReconcileConfig::default();
        let max_run_duration_secs = match lookup("DIRSYNC_MAX_RUN_SECS") {
            Some(value) => Some(parse_value("DIRSYNC_MAX_RUN_SECS", &value)?),
            None => None,
        };

        Ok(Self {
            destructive: parse_or(&lookup, "DIRSYNC_DESTRUCTIVE", false)?,
            reconcile: ReconcileConfig {
                verify_mapping_invariant: parse_or(
                    &lookup,
                    "DIRSYNC_VERIFY_MAPPINGS",
                    defaults.verify_mapping_invariant,
                )?,
                max_run_duration_secs,
                progress_log_interval: parse_or(
                    &lookup,
                    "DIRSYNC_PROGRESS_INTERVAL",
                    defaults.progress_log_interval,
                )?,
            },
        })
    }
}

/// Everything `dirsync sync` needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ldap: LdapConfig,
    pub run: RunConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::from_lookup(&lookup)?,
            ldap: ldap_config_from_lookup(&lookup)?,
            run: RunConfig::from_lookup(&lookup)?,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<String, ConfigError> {
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => parse_value(var, &value),
        _ => Ok(default),
    }
}

fn parse_value<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: var.to_string(),
        message: e.to_string(),
    })
}

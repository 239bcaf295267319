//! Service configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use inventory::RetryPolicy;
use submission::CoordinatorConfig;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but unusable.
    #[error("Invalid value for {var} ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected \"text\" or \"json\", got {other:?}")),
        }
    }
}

/// Service configuration.
///
/// Reads from environment variables:
/// - `DATABASE_URL` (required)
/// - `DATABASE_MAX_CONNECTIONS` (default: `10`)
/// - `INVENTORY_ADDR` (default: `"http://127.0.0.1:50051"`)
/// - `INVENTORY_MAX_ATTEMPTS` (default: `4`)
/// - `INVENTORY_BASE_DELAY_MS` (default: `100`)
/// - `INVENTORY_MAX_DELAY_MS` (default: `2000`)
/// - `SUBMIT_TIMEOUT_MS` (default: `5000`)
/// - `COMPENSATION_TIMEOUT_MS` (default: `10000`)
/// - `METRICS_ADDR` (default: `"0.0.0.0:9000"`)
/// - `RUST_LOG` (default: `"info"`)
/// - `LOG_FORMAT`, `text` or `json` (default: `text`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub inventory_addr: String,
    pub inventory_max_attempts: u32,
    pub inventory_base_delay: Duration,
    pub inventory_max_delay: Duration,
    pub submit_timeout: Duration,
    pub compensation_timeout: Duration,
    pub metrics_addr: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from an arbitrary variable source, falling back to
    /// defaults, and validates it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |var, default: Duration| {
            parse(&lookup, var, default.as_millis() as u64).map(Duration::from_millis)
        };

        let config = Self {
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: parse(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            inventory_addr: lookup("INVENTORY_ADDR").unwrap_or(defaults.inventory_addr),
            inventory_max_attempts: parse(
                &lookup,
                "INVENTORY_MAX_ATTEMPTS",
                defaults.inventory_max_attempts,
            )?,
            inventory_base_delay: millis("INVENTORY_BASE_DELAY_MS", defaults.inventory_base_delay)?,
            inventory_max_delay: millis("INVENTORY_MAX_DELAY_MS", defaults.inventory_max_delay)?,
            submit_timeout: millis("SUBMIT_TIMEOUT_MS", defaults.submit_timeout)?,
            compensation_timeout: millis("COMPENSATION_TIMEOUT_MS", defaults.compensation_timeout)?,
            metrics_addr: parse(&lookup, "METRICS_ADDR", defaults.metrics_addr)?,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse(&lookup, "LOG_FORMAT", defaults.log_format)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.database_max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", "0", "must be at least 1"));
        }
        if !(self.inventory_addr.starts_with("http://")
            || self.inventory_addr.starts_with("https://"))
        {
            return Err(invalid(
                "INVENTORY_ADDR",
                &self.inventory_addr,
                "must be an http:// or https:// URI",
            ));
        }
        if self.inventory_max_attempts == 0 {
            return Err(invalid("INVENTORY_MAX_ATTEMPTS", "0", "must be at least 1"));
        }
        if self.inventory_base_delay > self.inventory_max_delay {
            return Err(invalid(
                "INVENTORY_BASE_DELAY_MS",
                &self.inventory_base_delay.as_millis().to_string(),
                "must not exceed INVENTORY_MAX_DELAY_MS",
            ));
        }
        if self.submit_timeout.is_zero() {
            return Err(invalid("SUBMIT_TIMEOUT_MS", "0", "must be positive"));
        }
        if self.compensation_timeout.is_zero() {
            return Err(invalid("COMPENSATION_TIMEOUT_MS", "0", "must be positive"));
        }
        Ok(())
    }

    /// Retry policy for inventory calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.inventory_max_attempts,
            self.inventory_base_delay,
            self.inventory_max_delay,
        )
    }

    /// Coordinator settings.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            compensation_timeout: self.compensation_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 10,
            inventory_addr: "http://127.0.0.1:50051".to_string(),
            inventory_max_attempts: 4,
            inventory_base_delay: Duration::from_millis(100),
            inventory_max_delay: Duration::from_millis(2000),
            submit_timeout: Duration::from_millis(5000),
            compensation_timeout: Duration::from_millis(10_000),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(var, &value, &e.to_string())),
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

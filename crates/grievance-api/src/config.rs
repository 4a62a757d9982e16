//! Service configuration, read once from the environment at start-up.

use std::time::Duration;

use zeroize::Zeroizing;

use crate::sweeper::SweepConfig;

/// Deployment environment. Selects the default sweep cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
///
/// Custom `Debug` implementation redacts `database_url`, which usually
/// carries a password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<Zeroizing<String>>,
    pub environment: Environment,
    pub sweep: SweepConfig,
    /// Bound on each store call made by a caller action.
    pub store_timeout: Duration,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("environment", &self.environment)
            .field("sweep", &self.sweep)
            .field("store_timeout", &self.store_timeout)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            environment: Environment::Development,
            sweep: SweepConfig::default(),
            store_timeout: Duration::from_secs(5),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 3000)
    /// - `DATABASE_URL` (unset → in-memory store)
    /// - `APP_ENV` (`production` → hourly sweeps; anything else → every 60 s)
    /// - `SWEEP_INTERVAL_SECS` (overrides the `APP_ENV` cadence)
    /// - `SWEEP_STORE_TIMEOUT_SECS` (default: 10)
    /// - `STORE_TIMEOUT_SECS` (default: 5)
    /// - `LOG_FORMAT` (`json` → JSON lines; default: text)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let secs = |key: &str| -> Result<Option<Duration>, ConfigError> {
            match lookup(key) {
                None => Ok(None),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Some(Duration::from_secs(n))),
                    _ => Err(ConfigError::InvalidNumber(key.to_string(), raw)),
                },
            }
        };

        let port = match lookup("PORT") {
            None => defaults.port,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("PORT".into(), raw))?,
        };

        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            Some(env) if env.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        };

        let default_interval = match environment {
            Environment::Production => SweepConfig::PRODUCTION_INTERVAL,
            Environment::Development => SweepConfig::DEVELOPMENT_INTERVAL,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(fmt) if fmt.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            port,
            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .map(Zeroizing::new),
            environment,
            sweep: SweepConfig {
                interval: secs("SWEEP_INTERVAL_SECS")?.unwrap_or(default_interval),
                store_timeout: secs("SWEEP_STORE_TIMEOUT_SECS")?
                    .unwrap_or(SweepConfig::DEFAULT_STORE_TIMEOUT),
            },
            store_timeout: secs("STORE_TIMEOUT_SECS")?.unwrap_or(defaults.store_timeout),
            log_format,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be a positive whole number, got {1:?}")]
    InvalidNumber(String, String),
}

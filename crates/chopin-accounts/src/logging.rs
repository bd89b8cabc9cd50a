//! Logging and tracing initialization.
//!
//! The directory emits `tracing` events for lookups, token issuance,
//! redemption and sweeps. Raw token values are never logged. Install a
//! subscriber once at startup to see them:
//!
//! ```rust,no_run
//! let config = chopin_accounts::AccountsConfig::from_env();
//! chopin_accounts::logging::init_logging(&config).expect("logging already installed");
//! ```
//!
//! The level is controlled by `RUST_LOG`, e.g.
//! `RUST_LOG=chopin_accounts=debug,sqlx=warn`; the output format by
//! `LOG_FORMAT`.

use serde::Deserialize;
use std::str::FromStr;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AccountsConfig;
use crate::error::AccountError;

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// Multi-line output with source locations (development)
    Pretty,
    /// One JSON object per event (log aggregation)
    Json,
}

impl FromStr for LogFormat {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AccountError::Validation(format!(
                "unknown log format: {}",
                other
            ))),
        }
    }
}

/// Install the global subscriber in the configured format, at `info`
/// unless `RUST_LOG` says otherwise.
pub fn init_logging(config: &AccountsConfig) -> Result<(), AccountError> {
    init_logging_with_level(config.log_format, "info")
}

/// Install the global subscriber with a fallback level used when
/// `RUST_LOG` is unset. Fails if a subscriber is already installed.
pub fn init_logging_with_level(format: LogFormat, level: &str) -> Result<(), AccountError> {
    install(format, level)
        .map_err(|e| AccountError::Internal(format!("Failed to install logging: {}", e)))
}

fn install(format: LogFormat, level: &str) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(level));

    match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_line_number(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .try_init(),
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a test writer subscriber, ignoring the error if one exists.
///
/// Safe to call from every test.
pub fn try_init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parses_case_insensitively() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_second_install_is_an_error() {
        let config = AccountsConfig {
            log_format: LogFormat::Json,
            ..AccountsConfig::default()
        };
        // The first call may lose to another test; either way a subscriber is
        // installed afterwards.
        let _ = init_logging(&config);
        let err = init_logging(&config).unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}

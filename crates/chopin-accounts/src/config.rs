use serde::Deserialize;
use std::time::Duration;

use crate::logging::LogFormat;

/// Account directory configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Database connection URL (e.g. sqlite://accounts.db, postgres://...)
    pub database_url: String,

    /// Environment: development, production, test
    pub environment: String,

    /// How long an activation may stay pending before the sweep removes
    /// the unverified account (default: 86400 = 24h). Zero sweeps every
    /// pending activation.
    pub activation_expiry_secs: u64,

    /// Lifetime of a password-reset token (default: 3600 = 1h)
    pub password_reset_expiry_secs: u64,

    /// Interval between background pending-activation sweeps (default: 3600).
    /// Must be non-zero; zero falls back to the default.
    pub pending_sweep_interval_secs: u64,

    /// Log output format: compact, pretty or json (default: compact)
    pub log_format: LogFormat,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        AccountsConfig {
            database_url: "sqlite://accounts.db?mode=rwc".to_string(),
            environment: "development".to_string(),
            activation_expiry_secs: 86_400,
            password_reset_expiry_secs: 3_600,
            pending_sweep_interval_secs: 3_600,
            log_format: LogFormat::Compact,
        }
    }
}

impl AccountsConfig {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Self {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        let defaults = AccountsConfig::default();

        AccountsConfig {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            activation_expiry_secs: parse_secs(
                std::env::var("ACTIVATION_EXPIRY_SECS").ok(),
                defaults.activation_expiry_secs,
            ),
            password_reset_expiry_secs: parse_secs(
                std::env::var("PASSWORD_RESET_EXPIRY_SECS").ok(),
                defaults.password_reset_expiry_secs,
            ),
            pending_sweep_interval_secs: parse_nonzero_secs(
                std::env::var("PENDING_SWEEP_INTERVAL_SECS").ok(),
                defaults.pending_sweep_interval_secs,
            ),
            log_format: std::env::var("LOG_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
        }
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    pub fn activation_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.activation_expiry_secs as i64)
    }

    pub fn password_reset_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.password_reset_expiry_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.pending_sweep_interval_secs)
    }
}

fn parse_secs(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_nonzero_secs(raw: Option<String>, default: u64) -> u64 {
    match parse_secs(raw, default) {
        0 => default,
        secs => secs,
    }
}

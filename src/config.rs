//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/event-booking/config.toml`).
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! [server]
//! api_port = 8080
//!
//! [payments]
//! provider = "stripe"
//! secret_key = "sk_test_..."
//! platform_fee_percent = "10"
//!
//! [scheduler]
//! capture_interval_secs = 3600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ScheduleConfig;
use crate::infrastructure::DatabaseConfig;

pub const CONFIG_ENV: &str = "EVENT_BOOKING_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("event-booking")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub payments: PaymentsConfig,
    pub capacity: CapacityConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: defaults.url,
            max_connections: defaults.max_connections,
        }
    }
}

impl DatabaseSettings {
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    /// In-process processor for development; no money moves.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub provider: PaymentProvider,
    pub secret_key: Option<String>,
    pub api_base: String,
    /// Share of each booking kept by the platform, in percent
    pub platform_fee_percent: Decimal,
    pub request_timeout_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProvider::Stripe,
            secret_key: None,
            api_base: crate::infrastructure::payments::DEFAULT_API_BASE.to_string(),
            platform_fee_percent: Decimal::TEN,
            request_timeout_secs: 15,
        }
    }
}

impl PaymentsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Occurrences starting sooner than this cannot be cancelled
    pub protected_window_hours: i64,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            protected_window_hours: 24,
        }
    }
}

impl CapacityConfig {
    pub fn protected_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.protected_window_hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub capture_enabled: bool,
    pub capture_interval_secs: u64,
    pub capture_lookahead_hours: i64,
    pub reminder_enabled: bool,
    pub reminder_interval_secs: u64,
    pub reminder_lookahead_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capture_enabled: true,
            capture_interval_secs: 3600,
            capture_lookahead_hours: 24,
            reminder_enabled: true,
            reminder_interval_secs: 300,
            reminder_lookahead_hours: 24,
        }
    }
}

impl SchedulerConfig {
    pub fn capture(&self) -> ScheduleConfig {
        ScheduleConfig {
            interval: Duration::from_secs(self.capture_interval_secs),
            lookahead: chrono::Duration::hours(self.capture_lookahead_hours),
        }
    }

    pub fn reminders(&self) -> ScheduleConfig {
        ScheduleConfig {
            interval: Duration::from_secs(self.reminder_interval_secs),
            lookahead: chrono::Duration::hours(self.reminder_lookahead_hours),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Reminders are POSTed here when set, otherwise only logged
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Read and parse a configuration file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// `DATABASE_URL` and `STRIPE_SECRET_KEY` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
        if let Ok(key) = std::env::var("STRIPE_SECRET_KEY") {
            if !key.trim().is_empty() {
                self.payments.secret_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fee = self.payments.platform_fee_percent;
        if fee < Decimal::ZERO || fee > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Invalid(format!(
                "payments.platform_fee_percent must be between 0 and 100, got {}",
                fee
            )));
        }
        if self.payments.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "payments.request_timeout_secs must be positive".into(),
            ));
        }
        if self.payments.provider == PaymentProvider::Stripe
            && self
                .payments
                .secret_key
                .as_deref()
                .map_or(true, |k| k.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "payments.secret_key is required for the stripe provider".into(),
            ));
        }
        if self.scheduler.capture_interval_secs == 0 || self.scheduler.reminder_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler intervals must be positive".into(),
            ));
        }
        if self.scheduler.capture_lookahead_hours <= 0 || self.scheduler.reminder_lookahead_hours <= 0 {
            return Err(ConfigError::Invalid(
                "scheduler lookahead must be positive".into(),
            ));
        }
        if self.capacity.protected_window_hours < 0 {
            return Err(ConfigError::Invalid(
                "capacity.protected_window_hours must not be negative".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        Ok(())
    }
}

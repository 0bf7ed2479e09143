//! Event booking service
//!
//! Reads configuration from TOML (`~/.config/event-booking/config.toml`,
//! or the path in `EVENT_BOOKING_CONFIG`) and runs the API and schedulers
//! until SIGINT/SIGTERM.

use tracing::{error, info};

use event_booking::config::CONFIG_ENV;
use event_booking::{default_config_path, init_tracing, AppConfig, ServerHandle, ServerOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var(CONFIG_ENV)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());

    let config = match AppConfig::load(&config_path) {
        Ok(config) => {
            init_tracing(&config);
            info!("Configuration loaded from {}", config_path.display());
            config
        }
        Err(e) => {
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            init_tracing(&config);
            error!("Failed to load config: {}. Using defaults.", e);
            config
        }
    };

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: true,
    })
    .await?;

    handle.install_signal_handler();
    handle.shutdown_signal().wait().await;
    handle.wait().await;
    Ok(())
}

//! Event booking service CLI
//!
//! Runs the API and schedulers as a long-lived process, or a single batch.
//!
//! ```sh
//! # Run with default config (~/.config/event-booking/config.toml)
//! event-booking
//!
//! # Custom config path, different port
//! event-booking --config /etc/event-booking/config.toml --api-port 9090
//!
//! # Validate config without starting
//! event-booking --check
//!
//! # Capture due payments once and exit (e.g. from cron)
//! event-booking --capture-now
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use event_booking::config::{AppConfig, CONFIG_ENV};
use event_booking::server::{init_tracing, open_database, ServerHandle, ServerOptions, Services};

#[derive(Parser, Debug)]
#[command(
    name = "event-booking",
    version,
    about = "Registration, payment and capacity service for scheduled events",
    long_about = "Event booking service: REST API, payment capture scheduler and \
                  reminder scheduler.\n\n\
                  Default config: ~/.config/event-booking/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Run one payment capture pass and exit.
    #[arg(long)]
    capture_now: bool,

    /// Run one reminder pass and exit.
    #[arg(long)]
    remind_now: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(event_booking::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => {
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            (config, Some(e))
        }
    };

    // Overrides go in before tracing starts so --log-level takes effect.
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    if cli.check {
        return check(&config, &config_path, load_error);
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            warn!("Using default configuration.");
        }
    }
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }

    let result = if cli.capture_now || cli.remind_now {
        run_batches(&cli, config).await
    } else {
        serve(&cli, config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn check(config: &AppConfig, path: &std::path::Path, load_error: Option<event_booking::ConfigError>) -> ExitCode {
    if let Some(e) = load_error {
        eprintln!("❌ {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    println!("✅ Configuration is valid");
    println!("   Config file      : {}", path.display());
    println!("   API address      : {}:{}", config.server.api_host, config.server.api_port);
    println!("   Database         : {}", config.database.url);
    println!("   Payment provider : {:?}", config.payments.provider);
    println!("   Platform fee     : {}%", config.payments.platform_fee_percent);
    println!(
        "   Capture          : every {}s, {}h ahead{}",
        config.scheduler.capture_interval_secs,
        config.scheduler.capture_lookahead_hours,
        if config.scheduler.capture_enabled { "" } else { " (disabled)" }
    );
    println!(
        "   Reminders        : every {}s, {}h ahead{}",
        config.scheduler.reminder_interval_secs,
        config.scheduler.reminder_lookahead_hours,
        if config.scheduler.reminder_enabled { "" } else { " (disabled)" }
    );
    println!("   Log level        : {}", config.logging.level);
    ExitCode::SUCCESS
}

async fn serve(cli: &Cli, config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;
    Ok(())
}

async fn run_batches(cli: &Cli, config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;
    let db = open_database(&config, !cli.no_migrate).await?;
    let services = Services::build(&config, db.clone())?;

    if cli.capture_now {
        if let Some(report) = services.capture.run_once().await {
            println!(
                "capture: selected={} captured={} failed={}",
                report.selected, report.captured, report.failed
            );
        }
    }
    if cli.remind_now {
        if let Some(report) = services.reminders.run_once().await {
            println!(
                "reminders: selected={} sent={} failed={}",
                report.selected, report.sent, report.failed
            );
        }
    }

    db.close().await?;
    Ok(())
}

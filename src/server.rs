//! Server runtime
//!
//! [`ServerHandle`] owns the full lifecycle: database init and migrations,
//! service wiring, the REST API, the capture and reminder schedulers,
//! metrics, and graceful shutdown. The CLI uses [`Services`] directly for
//! one-shot batch runs.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    CapacityController, CaptureScheduler, PaymentCoordinator, RegistrationService,
    ReminderScheduler,
};
use crate::config::{AppConfig, PaymentProvider};
use crate::domain::{FeePolicy, PaymentProcessor, ReminderNotifier, RepositoryProvider};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{
    init_database, InMemoryPaymentProcessor, LogNotifier, SeaOrmRepositoryProvider,
    StripeProcessor, StripeSettings, WebhookNotifier,
};
use crate::interfaces::http::modules::health::HealthState;
use crate::interfaces::http::modules::metrics::MetricsState;
use crate::interfaces::http::{create_api_router, ApiState};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub type StartupResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

/// Connect to the configured database, migrating it first when asked.
pub async fn open_database(config: &AppConfig, auto_migrate: bool) -> StartupResult<DatabaseConnection> {
    let db = init_database(&config.database.to_database_config()).await?;
    if auto_migrate {
        info!("Running database migrations...");
        Migrator::up(&db, None).await?;
        info!("Migrations completed");
    }
    Ok(db)
}

fn build_processor(config: &AppConfig) -> StartupResult<Arc<dyn PaymentProcessor>> {
    let processor: Arc<dyn PaymentProcessor> = match config.payments.provider {
        PaymentProvider::Stripe => {
            let secret_key = config
                .payments
                .secret_key
                .clone()
                .ok_or("payments.secret_key is required for the stripe provider")?;
            Arc::new(StripeProcessor::new(StripeSettings {
                secret_key,
                api_base: config.payments.api_base.clone(),
                request_timeout: config.payments.request_timeout(),
            })?)
        }
        PaymentProvider::Memory => {
            warn!("⚠️  Using the in-memory payment processor, no money will move");
            Arc::new(InMemoryPaymentProcessor::new())
        }
    };
    Ok(processor)
}

fn build_notifier(config: &AppConfig) -> StartupResult<Arc<dyn ReminderNotifier>> {
    let notifier: Arc<dyn ReminderNotifier> = match &config.notifications.webhook_url {
        Some(url) => {
            info!(url = %url, "📨 Reminders will be posted to webhook");
            Arc::new(WebhookNotifier::new(url.clone(), NOTIFIER_TIMEOUT)?)
        }
        None => {
            info!("📨 No reminder webhook configured, reminders are logged only");
            Arc::new(LogNotifier)
        }
    };
    Ok(notifier)
}

/// Every service the API and the schedulers need, wired together.
#[derive(Clone)]
pub struct Services {
    pub repos: Arc<dyn RepositoryProvider>,
    pub payments: Arc<PaymentCoordinator>,
    pub capacity: Arc<CapacityController>,
    pub registrations: Arc<RegistrationService>,
    pub capture: Arc<CaptureScheduler>,
    pub reminders: Arc<ReminderScheduler>,
}

impl Services {
    pub fn build(config: &AppConfig, db: DatabaseConnection) -> StartupResult<Self> {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));
        Self::with_parts(config, repos, build_processor(config)?, build_notifier(config)?)
    }

    pub fn with_parts(
        config: &AppConfig,
        repos: Arc<dyn RepositoryProvider>,
        processor: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> StartupResult<Self> {
        let fee_policy = FeePolicy::new(config.payments.platform_fee_percent)?;
        info!(platform_fee_percent = %fee_policy.percent(), "Fee policy configured");

        let payments = Arc::new(PaymentCoordinator::new(
            processor,
            fee_policy,
            config.payments.request_timeout(),
        ));
        let capacity = Arc::new(CapacityController::new(
            repos.clone(),
            payments.clone(),
            config.capacity.protected_window(),
        ));
        let registrations = Arc::new(RegistrationService::new(
            repos.clone(),
            capacity.clone(),
            payments.clone(),
        ));
        let capture = Arc::new(CaptureScheduler::new(
            repos.clone(),
            payments.clone(),
            registrations.clone(),
            config.scheduler.capture(),
        ));
        let reminders = Arc::new(ReminderScheduler::new(
            repos.clone(),
            notifier,
            config.scheduler.reminders(),
        ));

        Ok(Self {
            repos,
            payments,
            capacity,
            registrations,
            capture,
            reminders,
        })
    }
}

/// The process-wide Prometheus recorder. It can only be installed once, so a
/// restart within the same process reuses it.
fn prometheus_handle() -> StartupResult<metrics_exporter_prometheus::PrometheusHandle> {
    use std::sync::OnceLock;
    static PROM_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install Prometheus recorder: {}", e))?;
    info!("📊 Prometheus metrics recorder installed");
    Ok(PROM_HANDLE.get_or_init(|| handle).clone())
}

/// Handle to a running service.
pub struct ServerHandle {
    pub services: Services,
    pub config: AppConfig,
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    scheduler_tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the service:
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database and run migrations
    /// 3. Wire services and start the enabled schedulers
    /// 4. Start the REST API (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> StartupResult<Self> {
        let config = opts.config;
        config.validate()?;

        info!("Starting event booking service...");

        let prometheus = prometheus_handle()?;

        let db = open_database(&config, opts.auto_migrate).await?;

        let services = Services::build(&config, db.clone())?;

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let mut scheduler_tasks = Vec::new();
        if config.scheduler.capture_enabled {
            scheduler_tasks.push(services.capture.start(shutdown_signal.clone()));
        } else {
            info!("Capture scheduler disabled");
        }
        if config.scheduler.reminder_enabled {
            scheduler_tasks.push(services.reminders.start(shutdown_signal.clone()));
        } else {
            info!("Reminder scheduler disabled");
        }

        let api_router = create_api_router(
            ApiState {
                registrations: services.registrations.clone(),
                capacity: services.capacity.clone(),
                payments: services.payments.clone(),
            },
            HealthState::new(Some(db.clone())),
            MetricsState { handle: prometheus },
        );

        let api_port = config.server.api_port;
        let api_addr = format!("{}:{}", config.server.api_host, api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Event booking service started");

        Ok(Self {
            services,
            config,
            api_port,
            db,
            shutdown,
            api_task,
            scheduler_tasks,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the API and schedulers to stop, bounded by the configured
    /// shutdown timeout, then close the database.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let grace = Duration::from_secs(self.shutdown.timeout_secs());
        let mut tasks = self.scheduler_tasks;
        tasks.push(self.api_task);

        match tokio::time::timeout(grace, futures_util::future::join_all(tasks)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!("Server task panicked: {}", e);
                    }
                }
                info!("All server tasks stopped");
            }
            Err(_) => warn!(
                timeout_secs = grace.as_secs(),
                "Server tasks did not stop within the shutdown timeout"
            ),
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 Event booking service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down event booking service...");
        self.trigger_shutdown();
        self.wait().await;
    }
}

/// Initialize tracing from the application config. `RUST_LOG` wins over
/// `logging.level`. Call once at process startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

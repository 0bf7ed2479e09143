//! # Event Booking Service
//!
//! Registration, payment and capacity control for scheduled events.
//! Guardians book children onto event occurrences; each booking holds a
//! seat and a manual-capture card authorization that is captured shortly
//! before the event, or refunded/voided on cancellation.
//!
//! ## Architecture
//!
//! - **domain**: entities, money types and the repository/processor ports
//! - **application**: registration lifecycle, payments, capacity, schedulers
//! - **infrastructure**: SeaORM store, in-memory store, Stripe, notifiers
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: errors, retry, saga, shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use interfaces::http::create_api_router;

pub use server::{init_tracing, ServerHandle, ServerOptions, Services};

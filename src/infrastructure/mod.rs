//! Infrastructure layer - external concerns

pub mod database;
pub mod notifications;
pub mod payments;
pub mod storage;

pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use notifications::{LogNotifier, WebhookNotifier};
pub use payments::{InMemoryPaymentProcessor, ProcessorOperation, StripeProcessor, StripeSettings};
pub use storage::InMemoryStorage;

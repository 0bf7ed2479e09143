pub mod entities;
pub mod migrator;
pub mod repositories;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

pub use repositories::SeaOrmRepositoryProvider;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./event_booking.db?mode=rwc";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./event_booking.db?mode=rwc" or "postgres://...")
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Create config for SQLite
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            ..Self::default()
        }
    }
}

/// Initialize database connection
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!("Connecting to database: {}", config.url);
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    info!("Database connected successfully");
    Ok(db)
}

#[cfg(test)]
pub(crate) mod test_support {
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
    use sea_orm_migration::MigratorTrait;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::entities::{child, event_occurrence, guardian, organization};
    use super::migrator::Migrator;
    use super::{init_database, DatabaseConfig};

    /// Fresh in-memory SQLite database with all migrations applied.
    pub async fn test_db() -> DatabaseConnection {
        let db = init_database(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    pub struct Seed {
        pub organization_id: Uuid,
        pub guardian_id: Uuid,
        pub child_id: Uuid,
        pub occurrence_id: Uuid,
    }

    /// Organization, guardian, child and one occurrence starting in `starts_in`.
    pub async fn seed(db: &DatabaseConnection, max_attendees: i32, starts_in: Duration) -> Seed {
        let now = Utc::now();
        let organization_id = Uuid::new_v4();
        let guardian_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let occurrence_id = Uuid::new_v4();

        organization::ActiveModel {
            id: Set(organization_id),
            name: Set("Little Makers".into()),
            connected_account_id: Set(Some("acct_1".into())),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();

        guardian::ActiveModel {
            id: Set(guardian_id),
            name: Set("Dana".into()),
            email: Set(Some("dana@example.com".into())),
            payment_account_id: Set(Some("cus_1".into())),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();

        child::ActiveModel {
            id: Set(child_id),
            guardian_id: Set(guardian_id),
            name: Set("Sam".into()),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();

        event_occurrence::ActiveModel {
            id: Set(occurrence_id),
            event_name: Set("Lego Robotics".into()),
            organization_id: Set(organization_id),
            start_time: Set(now + starts_in),
            end_time: Set(now + starts_in + Duration::hours(2)),
            max_attendees: Set(max_attendees),
            curr_enrolled: Set(0),
            price: Set(10_000),
            currency: Set("thb".into()),
            status: Set("scheduled".into()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();

        Seed {
            organization_id,
            guardian_id,
            child_id,
            occurrence_id,
        }
    }
}

//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::{
    DirectoryRepository, OccurrenceRepository, RegistrationRepository, RepositoryProvider,
};

use super::directory_repository::SeaOrmDirectoryRepository;
use super::occurrence_repository::SeaOrmOccurrenceRepository;
use super::registration_repository::SeaOrmRegistrationRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let occurrence = repos.occurrences().find_by_id(id).await?;
/// let admitted = repos.occurrences().try_admit(id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    registrations: SeaOrmRegistrationRepository,
    occurrences: SeaOrmOccurrenceRepository,
    directory: SeaOrmDirectoryRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            registrations: SeaOrmRegistrationRepository::new(db.clone()),
            occurrences: SeaOrmOccurrenceRepository::new(db.clone()),
            directory: SeaOrmDirectoryRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn registrations(&self) -> &dyn RegistrationRepository {
        &self.registrations
    }

    fn occurrences(&self) -> &dyn OccurrenceRepository {
        &self.occurrences
    }

    fn directory(&self) -> &dyn DirectoryRepository {
        &self.directory
    }
}

//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod directory_repository;
pub mod occurrence_repository;
pub mod registration_repository;
pub mod repository_provider;

pub use directory_repository::SeaOrmDirectoryRepository;
pub use occurrence_repository::SeaOrmOccurrenceRepository;
pub use registration_repository::SeaOrmRegistrationRepository;
pub use repository_provider::SeaOrmRepositoryProvider;

//! Repository traits for the domain layer
//!
//! - `RepositoryProvider`: access to every per-aggregate repository
//! - `DomainResult`: standard result type for domain operations

use super::directory::DirectoryRepository;
use super::occurrence::OccurrenceRepository;
use super::registration::RegistrationRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let occurrence = repos.occurrences().find_by_id(id).await?;
///     let active = repos.registrations().find_active_for_occurrence(id).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn registrations(&self) -> &dyn RegistrationRepository;
    fn occurrences(&self) -> &dyn OccurrenceRepository;
    fn directory(&self) -> &dyn DirectoryRepository;
}

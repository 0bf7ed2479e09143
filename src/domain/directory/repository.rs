use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Child, Guardian, Organization};
use crate::domain::DomainResult;

/// Point lookups used for referential validation.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn find_child(&self, id: Uuid) -> DomainResult<Option<Child>>;

    async fn find_guardian(&self, id: Uuid) -> DomainResult<Option<Guardian>>;

    async fn find_organization(&self, id: Uuid) -> DomainResult<Option<Organization>>;
}

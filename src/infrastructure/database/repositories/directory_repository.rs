//! Lookups of guardians, children and organizations

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::domain::{Child, DirectoryRepository, DomainResult, Guardian, Organization};
use crate::infrastructure::database::entities::{child, guardian, organization};

pub struct SeaOrmDirectoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmDirectoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DirectoryRepository for SeaOrmDirectoryRepository {
    async fn find_child(&self, id: Uuid) -> DomainResult<Option<Child>> {
        Ok(child::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|m| Child {
                id: m.id,
                guardian_id: m.guardian_id,
                name: m.name,
            }))
    }

    async fn find_guardian(&self, id: Uuid) -> DomainResult<Option<Guardian>> {
        Ok(guardian::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|m| Guardian {
                id: m.id,
                name: m.name,
                email: m.email,
                payment_account_id: m.payment_account_id,
            }))
    }

    async fn find_organization(&self, id: Uuid) -> DomainResult<Option<Organization>> {
        Ok(organization::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|m| Organization {
                id: m.id,
                name: m.name,
                connected_account_id: m.connected_account_id,
            }))
    }
}

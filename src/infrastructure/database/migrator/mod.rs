//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_organizations;
mod m20250301_000002_create_guardians;
mod m20250301_000003_create_children;
mod m20250301_000004_create_event_occurrences;
mod m20250301_000005_create_registrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_organizations::Migration),
            Box::new(m20250301_000002_create_guardians::Migration),
            Box::new(m20250301_000003_create_children::Migration),
            Box::new(m20250301_000004_create_event_occurrences::Migration),
            Box::new(m20250301_000005_create_registrations::Migration),
        ]
    }
}

//! Create children table

use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_guardians::Guardians;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Children::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Children::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Children::GuardianId).uuid().not_null())
                    .col(ColumnDef::new(Children::Name).string().not_null())
                    .col(
                        ColumnDef::new(Children::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_children_guardian")
                            .from(Children::Table, Children::GuardianId)
                            .to(Guardians::Table, Guardians::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_children_guardian")
                    .table(Children::Table)
                    .col(Children::GuardianId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Children::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Children {
    Table,
    Id,
    GuardianId,
    Name,
    CreatedAt,
}

//! Create guardians table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Guardians::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Guardians::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Guardians::Name).string().not_null())
                    .col(ColumnDef::new(Guardians::Email).string())
                    .col(ColumnDef::new(Guardians::PaymentAccountId).string())
                    .col(
                        ColumnDef::new(Guardians::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Guardians::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Guardians {
    Table,
    Id,
    Name,
    Email,
    PaymentAccountId,
    CreatedAt,
}

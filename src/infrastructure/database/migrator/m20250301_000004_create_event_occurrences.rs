//! Create event_occurrences table
//!
//! Holds the seat counters that admission and release update in place.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_organizations::Organizations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventOccurrences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventOccurrences::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventOccurrences::EventName).string().not_null())
                    .col(ColumnDef::new(EventOccurrences::OrganizationId).uuid().not_null())
                    .col(
                        ColumnDef::new(EventOccurrences::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventOccurrences::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventOccurrences::MaxAttendees)
                            .integer()
                            .not_null()
                            .check(Expr::col(EventOccurrences::MaxAttendees).gte(1)),
                    )
                    .col(
                        ColumnDef::new(EventOccurrences::CurrEnrolled)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(EventOccurrences::CurrEnrolled).gte(0)),
                    )
                    .col(ColumnDef::new(EventOccurrences::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(EventOccurrences::Currency)
                            .string()
                            .not_null()
                            .default("thb"),
                    )
                    .col(
                        ColumnDef::new(EventOccurrences::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(EventOccurrences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventOccurrences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_occurrences_organization")
                            .from(EventOccurrences::Table, EventOccurrences::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_occurrences_start_time")
                    .table(EventOccurrences::Table)
                    .col(EventOccurrences::StartTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventOccurrences::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum EventOccurrences {
    Table,
    Id,
    EventName,
    OrganizationId,
    StartTime,
    EndTime,
    MaxAttendees,
    CurrEnrolled,
    Price,
    Currency,
    Status,
    CreatedAt,
    UpdatedAt,
}

//! Create registrations table
//!
//! Composite indexes back the two scheduler scans:
//! capture (payment_status, occurrence_start_time) and
//! reminders (reminder_sent, occurrence_start_time).

use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_guardians::Guardians;
use super::m20250301_000003_create_children::Children;
use super::m20250301_000004_create_event_occurrences::EventOccurrences;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Registrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Registrations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Registrations::ChildId).uuid())
                    .col(ColumnDef::new(Registrations::GuardianId).uuid())
                    .col(
                        ColumnDef::new(Registrations::EventOccurrenceId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Registrations::Status)
                            .string()
                            .not_null()
                            .default("registered"),
                    )
                    .col(ColumnDef::new(Registrations::PaymentStatus).string().not_null())
                    .col(ColumnDef::new(Registrations::TotalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Registrations::ProviderAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Registrations::PlatformFeeAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Registrations::Currency)
                            .string()
                            .not_null()
                            .default("thb"),
                    )
                    .col(ColumnDef::new(Registrations::AuthorizationId).string().not_null())
                    .col(ColumnDef::new(Registrations::PayerAccountId).string().not_null())
                    .col(ColumnDef::new(Registrations::PayeeAccountId).string().not_null())
                    .col(ColumnDef::new(Registrations::PaymentMethodId).string())
                    .col(ColumnDef::new(Registrations::EventName).string().not_null())
                    .col(
                        ColumnDef::new(Registrations::OccurrenceStartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Registrations::ReminderSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Registrations::CancellationOutcome).string())
                    .col(ColumnDef::new(Registrations::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Registrations::CancelledAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Registrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Registrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registrations_event_occurrence")
                            .from(Registrations::Table, Registrations::EventOccurrenceId)
                            .to(EventOccurrences::Table, EventOccurrences::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registrations_guardian")
                            .from(Registrations::Table, Registrations::GuardianId)
                            .to(Guardians::Table, Guardians::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registrations_child")
                            .from(Registrations::Table, Registrations::ChildId)
                            .to(Children::Table, Children::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registrations_event_occurrence")
                    .table(Registrations::Table)
                    .col(Registrations::EventOccurrenceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registrations_child")
                    .table(Registrations::Table)
                    .col(Registrations::ChildId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registrations_guardian")
                    .table(Registrations::Table)
                    .col(Registrations::GuardianId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registrations_capture_due")
                    .table(Registrations::Table)
                    .col(Registrations::PaymentStatus)
                    .col(Registrations::OccurrenceStartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registrations_reminder_due")
                    .table(Registrations::Table)
                    .col(Registrations::ReminderSent)
                    .col(Registrations::OccurrenceStartTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Registrations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Registrations {
    Table,
    Id,
    ChildId,
    GuardianId,
    EventOccurrenceId,
    Status,
    PaymentStatus,
    TotalAmount,
    ProviderAmount,
    PlatformFeeAmount,
    Currency,
    AuthorizationId,
    PayerAccountId,
    PayeeAccountId,
    PaymentMethodId,
    EventName,
    OccurrenceStartTime,
    ReminderSent,
    CancellationOutcome,
    PaidAt,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}

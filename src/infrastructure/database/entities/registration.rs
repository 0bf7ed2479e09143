//! Registration entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(nullable)]
    pub child_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub guardian_id: Option<Uuid>,
    pub event_occurrence_id: Uuid,

    /// registered | cancelled
    pub status: String,
    pub payment_status: String,

    pub total_amount: i64,
    pub provider_amount: i64,
    pub platform_fee_amount: i64,
    pub currency: String,

    pub authorization_id: String,
    pub payer_account_id: String,
    pub payee_account_id: String,
    #[sea_orm(nullable)]
    pub payment_method_id: Option<String>,

    pub event_name: String,
    pub occurrence_start_time: DateTimeUtc,
    pub reminder_sent: bool,

    #[sea_orm(nullable)]
    pub cancellation_outcome: Option<String>,
    #[sea_orm(nullable)]
    pub paid_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event_occurrence::Entity",
        from = "Column::EventOccurrenceId",
        to = "super::event_occurrence::Column::Id"
    )]
    EventOccurrence,
    #[sea_orm(
        belongs_to = "super::guardian::Entity",
        from = "Column::GuardianId",
        to = "super::guardian::Column::Id"
    )]
    Guardian,
}

impl Related<super::event_occurrence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventOccurrence.def()
    }
}

impl Related<super::guardian::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guardian.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

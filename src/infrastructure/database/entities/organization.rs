//! Organization entity (provider receiving payouts)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Processor connected account
    #[sea_orm(nullable)]
    pub connected_account_id: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_occurrence::Entity")]
    EventOccurrence,
}

impl Related<super::event_occurrence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventOccurrence.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

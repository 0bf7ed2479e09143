//! SeaORM implementation of OccurrenceRepository
//!
//! Admission and release are single conditional UPDATEs; the affected row
//! count tells whether a seat changed hands.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    DomainError, DomainResult, EventOccurrence, OccurrenceRepository, OccurrenceStatus,
};
use crate::infrastructure::database::entities::event_occurrence::{self, Column};

pub struct SeaOrmOccurrenceRepository {
    db: DatabaseConnection,
}

impl SeaOrmOccurrenceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: event_occurrence::Model) -> DomainResult<EventOccurrence> {
    let status = OccurrenceStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Internal(format!("occurrence {} has unknown status {}", m.id, m.status))
    })?;
    Ok(EventOccurrence {
        id: m.id,
        event_name: m.event_name,
        organization_id: m.organization_id,
        start_time: m.start_time,
        end_time: m.end_time,
        max_attendees: m.max_attendees,
        curr_enrolled: m.curr_enrolled,
        price: m.price,
        currency: m.currency,
        status,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

/// Give back one seat on `occurrence_id`, floored at zero. Usable inside a
/// transaction.
pub(crate) async fn release_seat<C: ConnectionTrait>(
    conn: &C,
    occurrence_id: Uuid,
) -> Result<bool, DbErr> {
    let result = event_occurrence::Entity::update_many()
        .col_expr(Column::CurrEnrolled, Expr::col(Column::CurrEnrolled).sub(1))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(occurrence_id))
        .filter(Column::CurrEnrolled.gt(0))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

// ── OccurrenceRepository impl ───────────────────────────────────

#[async_trait]
impl OccurrenceRepository for SeaOrmOccurrenceRepository {
    async fn insert(&self, o: EventOccurrence) -> DomainResult<EventOccurrence> {
        if o.max_attendees < 1 {
            return Err(DomainError::Validation(
                "max_attendees must be at least 1".into(),
            ));
        }

        let model = event_occurrence::ActiveModel {
            id: Set(o.id),
            event_name: Set(o.event_name),
            organization_id: Set(o.organization_id),
            start_time: Set(o.start_time),
            end_time: Set(o.end_time),
            max_attendees: Set(o.max_attendees),
            curr_enrolled: Set(o.curr_enrolled),
            price: Set(o.price),
            currency: Set(o.currency),
            status: Set(o.status.as_str().to_string()),
            created_at: Set(o.created_at),
            updated_at: Set(o.updated_at),
        };
        let saved = model.insert(&self.db).await?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<EventOccurrence>> {
        event_occurrence::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn try_admit(&self, id: Uuid) -> DomainResult<bool> {
        let result = event_occurrence::Entity::update_many()
            .col_expr(Column::CurrEnrolled, Expr::col(Column::CurrEnrolled).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(OccurrenceStatus::Scheduled.as_str()))
            .filter(Expr::col(Column::CurrEnrolled).lt(Expr::col(Column::MaxAttendees)))
            .exec(&self.db)
            .await?;

        debug!(occurrence_id = %id, admitted = result.rows_affected == 1, "Seat admission");
        Ok(result.rows_affected == 1)
    }

    async fn release(&self, id: Uuid) -> DomainResult<bool> {
        Ok(release_seat(&self.db, id).await?)
    }

    async fn mark_cancelled(&self, id: Uuid) -> DomainResult<bool> {
        let result = event_occurrence::Entity::update_many()
            .col_expr(
                Column::Status,
                Expr::value(OccurrenceStatus::Cancelled.as_str()),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(OccurrenceStatus::Scheduled.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }
}

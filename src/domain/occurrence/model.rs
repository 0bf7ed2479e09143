//! Event occurrence: the capacity-bearing slot guardians book onto.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    Scheduled,
    Cancelled,
}

impl OccurrenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventOccurrence {
    pub id: Uuid,
    pub event_name: String,
    pub organization_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Always at least 1
    pub max_attendees: i32,
    /// Seats held by active registrations, `0..=max_attendees`
    pub curr_enrolled: i32,
    /// Booking price in minor units
    pub price: i64,
    pub currency: String,
    pub status: OccurrenceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventOccurrence {
    pub fn is_open(&self) -> bool {
        self.status == OccurrenceStatus::Scheduled && self.curr_enrolled < self.max_attendees
    }

    pub fn remaining(&self) -> i32 {
        (self.max_attendees - self.curr_enrolled).max(0)
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }

    /// True when the occurrence starts after `now` but no later than `now + window`.
    pub fn starts_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.start_time > now && self.start_time <= now + window
    }

    pub fn capacity(&self) -> CapacitySnapshot {
        CapacitySnapshot {
            occurrence_id: self.id,
            max_attendees: self.max_attendees,
            curr_enrolled: self.curr_enrolled,
            remaining: self.remaining(),
            status: self.status,
        }
    }
}

/// Read-only view of an occurrence's seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacitySnapshot {
    pub occurrence_id: Uuid,
    pub max_attendees: i32,
    pub curr_enrolled: i32,
    pub remaining: i32,
    pub status: OccurrenceStatus,
}

//! Read-only slices of records owned by other services.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub id: Uuid,
    pub guardian_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guardian {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Processor customer id holding the guardian's saved cards
    pub payment_account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Processor connected account receiving payouts
    pub connected_account_id: Option<String>,
}

//! Database entities module

pub mod child;
pub mod event_occurrence;
pub mod guardian;
pub mod organization;
pub mod registration;

pub use child::Entity as Child;
pub use event_occurrence::Entity as EventOccurrence;
pub use guardian::Entity as Guardian;
pub use organization::Entity as Organization;
pub use registration::Entity as Registration;

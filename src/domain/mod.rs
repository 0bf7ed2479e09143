pub mod directory;
pub mod notification;
pub mod occurrence;
pub mod payment;
pub mod registration;
pub mod repositories;

pub use directory::{Child, DirectoryRepository, Guardian, Organization};
pub use notification::{ReminderMessage, ReminderNotifier};
pub use occurrence::{CapacitySnapshot, EventOccurrence, OccurrenceRepository, OccurrenceStatus};
pub use payment::{FeePolicy, PaymentProcessor, PaymentSplit, PaymentStatus, RefundOutcome};
pub use registration::{
    payment_status_locked, BookingStatus, CancellationRecord, NewRegistration, Registration,
    RegistrationRepository, ReminderTarget,
};
pub use repositories::{DomainResult, RepositoryProvider};

pub use crate::shared::errors::{DomainError, ProcessorError};

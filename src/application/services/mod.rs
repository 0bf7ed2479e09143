//! Application services

pub mod capacity;
pub mod capture;
pub mod payments;
pub mod registration;
pub mod reminders;
mod schedule;

pub use capacity::{CapacityController, OccurrenceCancellation};
pub use capture::{CaptureReport, CaptureScheduler};
pub use payments::{Authorization, AuthorizationParams, PaymentCoordinator};
pub use registration::{
    CancellationResult, CreateRegistration, CreatedRegistration, RegistrationService,
};
pub use reminders::{ReminderReport, ReminderScheduler};
pub use schedule::{RunGuard, ScheduleConfig};

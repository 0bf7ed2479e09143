pub mod services;

pub use services::{
    CapacityController, CancellationResult, CaptureReport, CaptureScheduler, CreateRegistration,
    CreatedRegistration, OccurrenceCancellation, PaymentCoordinator, RegistrationService,
    ReminderReport, ReminderScheduler, ScheduleConfig,
};

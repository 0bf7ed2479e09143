//! Reminder delivery channels

mod log;
mod webhook;

pub use log::LogNotifier;
pub use webhook::WebhookNotifier;

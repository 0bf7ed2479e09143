//! Payment processor adapters

pub mod memory;
pub mod stripe;

pub use memory::{InMemoryPaymentProcessor, ProcessorOperation};
pub use stripe::{StripeProcessor, StripeSettings, DEFAULT_API_BASE};

pub mod health;
pub mod metrics;
pub mod occurrences;
pub mod payment_methods;
pub mod registrations;
pub mod request_id;

//! Saved payment method endpoints

pub mod handlers;

pub use handlers::*;

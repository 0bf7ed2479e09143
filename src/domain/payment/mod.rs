pub mod model;
pub mod processor;

pub use model::*;
pub use processor::*;

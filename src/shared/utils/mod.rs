pub mod retry;
pub mod saga;

pub use retry::*;
pub use saga::*;

pub mod fan_out;
pub mod memory;

pub use fan_out::{FanOutError, FanOutExecutor};

// Common types and utilities shared across the application

pub mod clock;
pub mod money;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use money::round_currency;

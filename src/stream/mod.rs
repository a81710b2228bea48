//! Stream adapters for record updates

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

//! Delivery rate for record streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a subscriber wants to see the latest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every published record.
    #[default]
    Native,

    /// At most `n` records per second, latest wins.
    Max(u32),
}

impl UpdateRate {
    /// Throttle period, or `None` when no throttling applies.
    ///
    /// `Max(0)` is treated as `Native`.
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}

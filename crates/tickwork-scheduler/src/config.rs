//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`TaskRegistry`](crate::TaskRegistry).
///
/// None of these change scheduling semantics; they only control what the
/// registry observes and logs about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Emit a warning when a single callback runs longer than this many
    /// milliseconds of wall-clock time. `0` disables the check.
    ///
    /// Default: 5 ms, a tenth of a 20 Hz tick budget.
    pub slow_callback_warn_ms: u64,

    /// Maintain the cumulative [`SchedulerMetrics`](crate::SchedulerMetrics).
    pub metrics_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slow_callback_warn_ms: 5,
            metrics_enabled: true,
        }
    }
}

//! Pacer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// What the pacer does when it wakes up late.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrunPolicy {
    /// Re-anchor the cadence to the late wake-up. Missed intervals are
    /// reported in [`PacedTick::ticks_skipped`](crate::PacedTick) and never
    /// replayed.
    #[default]
    Skip,
    /// Keep the original cadence. After a long stall the next deadlines are
    /// already in the past, so ticks fire back to back until the schedule is
    /// met again.
    Drop,
}

/// Settings for a [`TickPacer`](crate::TickPacer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    /// Logical ticks per second. Valid range `1..=128`. Default: 20.
    pub tick_rate_hz: u32,
    /// Overrun handling.
    pub policy: OverrunPolicy,
    /// Fraction of the tick budget (`0.0..=1.0`) above which the time
    /// reported through `record_tick_end` logs a warning. Default: 0.8.
    pub budget_warn_threshold: f64,
    /// Random delay, up to this many microseconds, added before the first
    /// tick so domains started together do not all tick in the same
    /// instant. Default: 2000.
    pub initial_jitter_us: u64,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            policy: OverrunPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter_us: 2_000,
        }
    }
}

impl PacerConfig {
    /// Highest supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Config for `tick_rate_hz` with every other field at its default.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Clamps out-of-range values into range, logging each fix.
    ///
    /// `tick_rate_hz` is clamped to `1..=MAX_TICK_RATE_HZ` and the warning
    /// threshold to `0.0..=1.0` (NaN becomes the default).
    pub fn validated(mut self) -> Self {
        let rate = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            warn!(
                rate = self.tick_rate_hz,
                clamped = rate,
                "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = rate;
        }
        if self.budget_warn_threshold.is_nan() {
            warn!("budget_warn_threshold is NaN, using default");
            self.budget_warn_threshold = Self::default().budget_warn_threshold;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Wall-clock length of one tick. Assumes a validated config.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

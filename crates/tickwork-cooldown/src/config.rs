//! Cooldown store configuration.

use serde::{Deserialize, Serialize};
use tickwork_clock::Tick;
use tracing::warn;

/// Settings for a [`CooldownStore`](crate::CooldownStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Minimum ticks between two full sweeps run through
    /// [`maybe_sweep`](crate::CooldownStore::maybe_sweep).
    ///
    /// Default: 1200 (one minute at 20 ticks per second). `0` disables
    /// interval-gated sweeps; `sweep_expired` can still be called directly.
    pub sweep_interval_ticks: Tick,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ticks: 1200,
        }
    }
}

impl CooldownConfig {
    /// Clamps out-of-range values. A negative interval becomes 0 (disabled).
    pub fn validated(mut self) -> Self {
        if self.sweep_interval_ticks < 0 {
            warn!(
                interval = self.sweep_interval_ticks,
                "negative sweep_interval_ticks, disabling interval sweeps"
            );
            self.sweep_interval_ticks = 0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sweeps_every_minute_at_20hz() {
        assert_eq!(CooldownConfig::default().sweep_interval_ticks, 1200);
    }

    #[test]
    fn test_validated_negative_interval_disables() {
        let config = CooldownConfig {
            sweep_interval_ticks: -3,
        }
        .validated();
        assert_eq!(config.sweep_interval_ticks, 0);
    }

    #[test]
    fn test_deserialize_missing_fields_uses_defaults() {
        let config: CooldownConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CooldownConfig::default());
    }
}

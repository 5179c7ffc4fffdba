//! Engine-wide configuration.

use serde::{Deserialize, Serialize};
use tickwork_cooldown::CooldownConfig;
use tickwork_pacer::PacerConfig;
use tickwork_scheduler::SchedulerConfig;

use crate::TickworkError;

/// Configuration for an [`Engine`](crate::Engine) and the domain loops
/// spawned over it. Every section is optional in serialized form.
///
/// ```
/// let config = tickwork::EngineConfig::from_json_str(
///     r#"{ "pacer": { "tick_rate_hz": 30 }, "cooldowns": { "sweep_interval_ticks": 600 } }"#,
/// )?;
/// assert_eq!(config.pacer.tick_rate_hz, 30);
/// # Ok::<(), tickwork::TickworkError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cooldowns: CooldownConfig,
    pub scheduler: SchedulerConfig,
    /// Default pacing for domain loops.
    pub pacer: PacerConfig,
}

impl EngineConfig {
    /// Parses a JSON document and validates every section.
    pub fn from_json_str(json: &str) -> Result<Self, TickworkError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Clamps out-of-range values in every section.
    pub fn validated(self) -> Self {
        Self {
            cooldowns: self.cooldowns.validated(),
            scheduler: self.scheduler,
            pacer: self.pacer.validated(),
        }
    }
}

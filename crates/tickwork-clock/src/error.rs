//! Error types for clock sources.

use crate::Tick;

/// Errors returned by [`ManualClock`](crate::ManualClock) mutations.
///
/// Reads never fail: an unknown domain simply has no current tick.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    /// The domain was never created (or was removed).
    #[error("unknown domain {0}")]
    UnknownDomain(String),

    /// The requested tick is earlier than the domain's current tick.
    /// Ticks only move backwards when a domain is recreated.
    #[error("clock cannot go backwards: current tick {current}, requested {requested}")]
    Regressed {
        /// The domain's tick before the rejected call.
        current: Tick,
        /// The tick that was asked for.
        requested: Tick,
    },

    /// `advance` was called with a negative step.
    #[error("cannot advance by a negative step ({0})")]
    NegativeStep(Tick),
}

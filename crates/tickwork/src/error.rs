//! Unified error type for Tickwork.

use tickwork_clock::ClockError;
use tickwork_scheduler::TaskError;

/// A domain loop could not be reached.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The loop's task has stopped (shut down or panicked), so its command
    /// channel is closed.
    #[error("domain loop for {0} is no longer running")]
    Unavailable(String),
}

/// Top-level error wrapping every crate-specific error.
///
/// Each variant has a `From` impl, so `?` converts sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum TickworkError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// An [`EngineConfig`](crate::EngineConfig) document failed to parse.
    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),
}

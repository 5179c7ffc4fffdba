//! Error types for the scheduler.

use tickwork_clock::Tick;

use crate::TaskId;

/// Errors from scheduling and from running tasks.
///
/// Validation errors ([`InvalidPeriod`](Self::InvalidPeriod),
/// [`InvalidExecutionLimit`](Self::InvalidExecutionLimit)) are returned
/// straight from `schedule_periodic`. Execution errors are never returned
/// from `process_domain`; they are collected into its
/// [`ProcessingReport`](crate::ProcessingReport) as
/// [`CallbackFailed`](Self::CallbackFailed).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A periodic task needs a positive period; zero or less would re-run
    /// it forever within one tick.
    #[error("period must be positive, got {0}")]
    InvalidPeriod(Tick),

    /// `max_executions = Some(0)` describes work that can never run.
    #[error("execution limit must be at least 1")]
    InvalidExecutionLimit,

    /// Returned by a task callback to signal that it failed.
    #[error("{0}")]
    Failed(String),

    /// The task callback panicked. The payload message, if it had one.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// A task's callback failed during processing. The task was retired.
    #[error("task {id} failed: {cause}")]
    CallbackFailed {
        /// The task that failed.
        id: TaskId,
        /// What the callback returned (or how it panicked).
        #[source]
        cause: Box<TaskError>,
    },
}

impl TaskError {
    /// Shorthand for callbacks: `Err(TaskError::failed("target despawned"))`.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// The failing task, for [`CallbackFailed`](Self::CallbackFailed).
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::CallbackFailed { id, .. } => Some(*id),
            _ => None,
        }
    }
}

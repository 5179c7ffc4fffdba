//! Task identity and the per-task record owned by the registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tickwork_clock::Tick;

use crate::registry::TaskCallback;

/// Counter for task ids. Shared by every registry in the process, so an id
/// is never reused, even across registries.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a scheduled task.
///
/// Callers only ever hold this handle, never a reference into the task
/// itself. Handles stay valid to pass around after the task is gone;
/// operations on them simply report that the task no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates a fresh, never-before-used id.
    pub(crate) fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The numeric value, for logging and metrics labels.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// Where a live task is in its lifecycle.
///
/// Retired and cancelled tasks are gone from the registry, so only the two
/// live states are observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for its due tick.
    Scheduled,
    /// Its callback is running inside `process_domain` right now.
    Executing,
}

/// A read-only snapshot of a task, returned by
/// [`TaskRegistry::task_info`](crate::TaskRegistry::task_info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo<D> {
    /// The task's handle.
    pub id: TaskId,
    /// The domain the task is bound to.
    pub domain: D,
    /// First tick at which the task may run.
    pub due_tick: Tick,
    /// `None` for one-shot tasks.
    pub period_ticks: Option<Tick>,
    /// `None` means unbounded (periodic tasks only).
    pub max_executions: Option<u32>,
    /// How many times the callback has run.
    pub execution_count: u32,
    /// Current lifecycle state.
    pub state: TaskState,
}

/// Everything the registry knows about one task.
pub(crate) struct TaskRecord<D, C> {
    pub(crate) id: TaskId,
    pub(crate) domain: D,
    pub(crate) due_tick: Tick,
    pub(crate) period_ticks: Option<Tick>,
    pub(crate) max_executions: Option<u32>,
    pub(crate) execution_count: u32,
    pub(crate) state: TaskState,
    pub(crate) callback: TaskCallback<C>,
}

impl<D: Clone, C> TaskRecord<D, C> {
    /// `true` if the task may run at `now`.
    pub(crate) fn is_due(&self, now: Tick) -> bool {
        self.due_tick <= now
    }

    /// After a successful run: does the task go round again?
    pub(crate) fn should_reschedule(&self) -> bool {
        if self.period_ticks.is_none() {
            return false;
        }
        self.max_executions
            .is_none_or(|max| self.execution_count < max)
    }

    pub(crate) fn info(&self) -> TaskInfo<D> {
        TaskInfo {
            id: self.id,
            domain: self.domain.clone(),
            due_tick: self.due_tick,
            period_ticks: self.period_ticks,
            max_executions: self.max_executions,
            execution_count: self.execution_count,
            state: self.state,
        }
    }
}

//! What one processing pass did, and what the registry has done overall.

use std::sync::atomic::{AtomicU64, Ordering};

use tickwork_clock::Tick;

use crate::{TaskError, TaskId};

/// Outcome of one [`process_domain`](crate::TaskRegistry::process_domain)
/// call.
///
/// Callback failures never abort a pass; they are collected in
/// [`failures`](Self::failures) and the embedder decides whether to log,
/// alert, or resubmit.
#[derive(Debug, Default)]
pub struct ProcessingReport {
    /// The tick the pass ran at.
    pub tick: Tick,
    /// Callbacks invoked (successful or not).
    pub executed: usize,
    /// Periodic tasks put back with a new due tick.
    pub rescheduled: usize,
    /// Tasks removed because they ran their last time.
    pub retired: usize,
    /// Tasks cancelled from inside a callback during this pass.
    pub cancelled_in_flight: usize,
    /// Index entries found without a task behind them, and removed.
    pub stale_handles: usize,
    /// One [`TaskError::CallbackFailed`] per failed task. Failed tasks are
    /// retired and are not counted in [`retired`](Self::retired).
    pub failures: Vec<TaskError>,
}

impl ProcessingReport {
    pub(crate) fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// `true` if no callback failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Ids of the tasks whose callback failed.
    pub fn failed_tasks(&self) -> Vec<TaskId> {
        self.failures.iter().filter_map(TaskError::task_id).collect()
    }
}

/// Cumulative counters for a registry, read via
/// [`TaskRegistry::metrics`](crate::TaskRegistry::metrics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerMetrics {
    /// Tasks ever scheduled.
    pub total_scheduled: u64,
    /// Callback invocations.
    pub total_executions: u64,
    /// Invocations that returned an error or panicked.
    pub total_failures: u64,
    /// Tasks retired after their last successful run.
    pub total_retired: u64,
    /// Tasks removed by `cancel` or `clear_domain`.
    pub total_cancelled: u64,
}

/// Lock-free backing store for [`SchedulerMetrics`].
#[derive(Debug, Default)]
pub(crate) struct MetricCounters {
    scheduled: AtomicU64,
    executions: AtomicU64,
    failures: AtomicU64,
    retired: AtomicU64,
    cancelled: AtomicU64,
}

impl MetricCounters {
    pub(crate) fn scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cancelled(&self, count: u64) {
        self.cancelled.fetch_add(count, Ordering::Relaxed);
    }

    /// Folds one processing pass into the totals.
    pub(crate) fn record_pass(&self, report: &ProcessingReport) {
        self.executions
            .fetch_add(report.executed as u64, Ordering::Relaxed);
        self.failures
            .fetch_add(report.failures.len() as u64, Ordering::Relaxed);
        self.retired
            .fetch_add(report.retired as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            total_scheduled: self.scheduled.load(Ordering::Relaxed),
            total_executions: self.executions.load(Ordering::Relaxed),
            total_failures: self.failures.load(Ordering::Relaxed),
            total_retired: self.retired.load(Ordering::Relaxed),
            total_cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

//! The task registry: owns every scheduled task and runs due ones.
//!
//! # Concurrency note
//!
//! Tasks live in a sharded concurrent map keyed by [`TaskId`], and the
//! [`DomainIndex`] maps each domain to its task ids. Both are updated by
//! the registry only, in a fixed order (task map first on insert, task map
//! first on removal), so a handle found in the index without a task behind
//! it can only be a removal in progress. `process_domain` treats such a
//! handle as stale and drops it from the index.
//!
//! No map guard is ever held while a callback runs. A callback may
//! therefore schedule, cancel, or clear anything, including itself,
//! without deadlocking. The running invocation keeps its own reference to
//! the callback, so cancelling a task mid-run never frees the closure
//! under it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tickwork_clock::{DomainKey, Tick};
use tracing::{debug, info, trace, warn};

use crate::index::DomainIndex;
use crate::report::MetricCounters;
use crate::task::TaskRecord;
use crate::{
    ProcessingReport, SchedulerConfig, SchedulerMetrics, TaskError, TaskId, TaskInfo, TaskState,
};

/// A scheduled callback. Receives the domain context the embedder passes
/// to [`TaskRegistry::process_domain`].
pub type TaskCallback<C> = Arc<dyn Fn(&C) -> Result<(), TaskError> + Send + Sync>;

/// Result of trying to start one indexed task.
enum Claim<C> {
    Run(TaskCallback<C>),
    NotDue,
    Stale,
}

/// What happens to a task after its callback returned.
enum Settle {
    /// Removed while running (cancel or clear_domain from anywhere).
    Gone(Option<TaskError>),
    Rescheduled(Tick),
    Retire,
    Fail(TaskError),
}

/// Owns scheduled tasks and the per-domain index over them.
///
/// One registry serves any number of domains. `D` is the domain key, `C`
/// the context type handed to callbacks; the registry never looks inside
/// either.
pub struct TaskRegistry<D: DomainKey, C> {
    /// Every live task, keyed by id.
    tasks: DashMap<TaskId, TaskRecord<D, C>>,

    /// Domain → ids of the tasks bound to it. Kept in sync with `tasks`.
    index: DomainIndex<D>,

    config: SchedulerConfig,
    metrics: MetricCounters,
}

impl<D: DomainKey, C> TaskRegistry<D, C> {
    /// Creates an empty registry.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            tasks: DashMap::new(),
            index: DomainIndex::new(),
            config,
            metrics: MetricCounters::default(),
        }
    }

    /// Schedules `callback` to run once, `delay_ticks` after `now`.
    ///
    /// A negative delay counts as 0: the task runs on the next
    /// `process_domain` pass for its domain. Always succeeds.
    pub fn schedule_delayed<F>(&self, domain: D, callback: F, delay_ticks: Tick, now: Tick) -> TaskId
    where
        F: Fn(&C) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        let due_tick = now.saturating_add(delay_ticks.max(0));
        self.insert(domain, Arc::new(callback), due_tick, None, Some(1))
    }

    /// Schedules `callback` to run `initial_delay_ticks` after `now`, then
    /// every `period_ticks` after each run, until cancelled or until it has
    /// run `max_executions` times (`None` = no limit).
    ///
    /// # Errors
    /// - [`TaskError::InvalidPeriod`] if `period_ticks <= 0`.
    /// - [`TaskError::InvalidExecutionLimit`] if `max_executions == Some(0)`.
    ///
    /// No task is created when an error is returned.
    pub fn schedule_periodic<F>(
        &self,
        domain: D,
        callback: F,
        initial_delay_ticks: Tick,
        period_ticks: Tick,
        max_executions: Option<u32>,
        now: Tick,
    ) -> Result<TaskId, TaskError>
    where
        F: Fn(&C) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        if period_ticks <= 0 {
            return Err(TaskError::InvalidPeriod(period_ticks));
        }
        if max_executions == Some(0) {
            return Err(TaskError::InvalidExecutionLimit);
        }
        let due_tick = now.saturating_add(initial_delay_ticks.max(0));
        Ok(self.insert(
            domain,
            Arc::new(callback),
            due_tick,
            Some(period_ticks),
            max_executions,
        ))
    }

    /// Removes a task. Returns `true` if it existed.
    ///
    /// Safe to call from anywhere, including from inside the task's own
    /// callback: the running invocation finishes normally, and the task
    /// is not rescheduled afterwards. Unknown ids return `false`.
    pub fn cancel(&self, id: TaskId) -> bool {
        let Some((_, record)) = self.tasks.remove(&id) else {
            return false;
        };
        self.index.remove(&record.domain, id);
        if self.config.metrics_enabled {
            self.metrics.cancelled(1);
        }
        debug!(
            task_id = %id,
            domain = ?record.domain,
            in_flight = record.state == TaskState::Executing,
            "task cancelled"
        );
        true
    }

    /// Runs every due task bound to `domain`.
    ///
    /// For each task indexed under `domain` whose due tick is `<= now`,
    /// the callback is invoked with `ctx`, then:
    ///
    /// - **success, periodic, under its limit** → due again at
    ///   `now + period`. Computed from the tick it actually ran, so a
    ///   domain that was not processed for a while runs the task once, not
    ///   once per missed period.
    /// - **success otherwise** → retired.
    /// - **error or panic** → retired and reported in
    ///   [`ProcessingReport::failures`]. Never retried.
    ///
    /// Tasks scheduled by a callback during the pass are not run until the
    /// next pass. The order in which due tasks run is unspecified.
    ///
    /// Must not be called concurrently for the same domain. Different
    /// domains may be processed in parallel.
    pub fn process_domain(&self, domain: &D, ctx: &C, now: Tick) -> ProcessingReport {
        let mut report = ProcessingReport::new(now);

        for id in self.index.snapshot(domain) {
            let callback = match self.claim(domain, id, now) {
                Claim::Run(callback) => callback,
                Claim::NotDue => continue,
                Claim::Stale => {
                    // A cancel racing with this pass already cleaned up
                    // when the index no longer has the handle.
                    if self.index.remove(domain, id) {
                        warn!(task_id = %id, ?domain, "stale task handle removed from domain index");
                        report.stale_handles += 1;
                    }
                    continue;
                }
            };

            let started = Instant::now();
            let outcome = run_guarded(&callback, ctx);
            self.warn_if_slow(id, started.elapsed());
            report.executed += 1;

            self.settle(domain, id, now, outcome, &mut report);
        }

        if self.config.metrics_enabled {
            self.metrics.record_pass(&report);
        }
        if report.executed > 0 {
            trace!(
                ?domain,
                tick = now,
                executed = report.executed,
                rescheduled = report.rescheduled,
                retired = report.retired,
                failed = report.failures.len(),
                "domain processed"
            );
        }
        report
    }

    /// Removes every task bound to `domain`. Returns how many were removed.
    ///
    /// Call this when a domain is torn down; the registry does not notice
    /// on its own.
    pub fn clear_domain(&self, domain: &D) -> usize {
        let removed = self
            .index
            .take(domain)
            .into_iter()
            .filter(|id| self.tasks.remove(id).is_some())
            .count();
        if self.config.metrics_enabled {
            self.metrics.cancelled(removed as u64);
        }
        info!(?domain, removed, "domain tasks cleared");
        removed
    }

    /// Number of tasks bound to `domain`.
    pub fn task_count(&self, domain: &D) -> usize {
        self.index.count(domain)
    }

    /// `true` if the task exists (scheduled or currently executing).
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Snapshot of a live task.
    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo<D>> {
        self.tasks.get(&id).map(|record| record.info())
    }

    /// Total number of live tasks across all domains.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` if no task is scheduled anywhere.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Every domain that currently has at least one task.
    pub fn domains(&self) -> Vec<D> {
        self.index.domains()
    }

    /// Cumulative counters. All zero when metrics are disabled.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.snapshot()
    }

    /// The registry's configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn insert(
        &self,
        domain: D,
        callback: TaskCallback<C>,
        due_tick: Tick,
        period_ticks: Option<Tick>,
        max_executions: Option<u32>,
    ) -> TaskId {
        let id = TaskId::next();
        debug!(task_id = %id, ?domain, due_tick, ?period_ticks, ?max_executions, "task scheduled");

        let record = TaskRecord {
            id,
            domain: domain.clone(),
            due_tick,
            period_ticks,
            max_executions,
            execution_count: 0,
            state: TaskState::Scheduled,
            callback,
        };
        self.tasks.insert(id, record);
        self.index.insert(domain, id);

        if self.config.metrics_enabled {
            self.metrics.scheduled();
        }
        id
    }

    /// Marks a due task as executing and hands out its callback. The map
    /// guard is released before this returns.
    fn claim(&self, domain: &D, id: TaskId, now: Tick) -> Claim<C> {
        let Some(mut record) = self.tasks.get_mut(&id) else {
            return Claim::Stale;
        };
        if record.domain != *domain {
            return Claim::Stale;
        }
        if !record.is_due(now) {
            return Claim::NotDue;
        }
        record.state = TaskState::Executing;
        Claim::Run(Arc::clone(&record.callback))
    }

    /// Applies the outcome of one run: reschedule, retire, or fail.
    fn settle(
        &self,
        domain: &D,
        id: TaskId,
        now: Tick,
        outcome: Result<(), TaskError>,
        report: &mut ProcessingReport,
    ) {
        let settle = match self.tasks.get_mut(&id) {
            None => Settle::Gone(outcome.err()),
            Some(mut record) => {
                record.execution_count = record.execution_count.saturating_add(1);
                match (outcome, record.period_ticks) {
                    (Err(cause), _) => Settle::Fail(cause),
                    (Ok(()), Some(period)) if record.should_reschedule() => {
                        record.due_tick = now.saturating_add(period);
                        record.state = TaskState::Scheduled;
                        Settle::Rescheduled(record.due_tick)
                    }
                    (Ok(()), _) => Settle::Retire,
                }
            }
        };

        match settle {
            Settle::Gone(failure) => {
                debug!(task_id = %id, "task removed while running");
                report.cancelled_in_flight += 1;
                if let Some(cause) = failure {
                    warn!(task_id = %id, ?domain, error = %cause, "cancelled task failed");
                    report.failures.push(TaskError::CallbackFailed {
                        id,
                        cause: Box::new(cause),
                    });
                }
            }
            Settle::Rescheduled(due_tick) => {
                trace!(task_id = %id, due_tick, "task rescheduled");
                report.rescheduled += 1;
            }
            Settle::Retire => {
                self.remove(domain, id);
                debug!(task_id = %id, "task retired");
                report.retired += 1;
            }
            Settle::Fail(cause) => {
                self.remove(domain, id);
                warn!(task_id = %id, ?domain, error = %cause, "task failed and was retired");
                report.failures.push(TaskError::CallbackFailed {
                    id,
                    cause: Box::new(cause),
                });
            }
        }
    }

    fn remove(&self, domain: &D, id: TaskId) {
        self.tasks.remove(&id);
        self.index.remove(domain, id);
    }

    fn warn_if_slow(&self, id: TaskId, elapsed: Duration) {
        let limit_ms = self.config.slow_callback_warn_ms;
        if limit_ms > 0 && elapsed > Duration::from_millis(limit_ms) {
            warn!(
                task_id = %id,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                limit_ms,
                "slow task callback"
            );
        }
    }
}

impl<D: DomainKey, C> Default for TaskRegistry<D, C> {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl<D: DomainKey, C> std::fmt::Debug for TaskRegistry<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.tasks.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Invokes a callback, turning a panic into [`TaskError::Panicked`] so one
/// misbehaving task cannot take the rest of the pass down with it.
fn run_guarded<C>(callback: &TaskCallback<C>, ctx: &C) -> Result<(), TaskError> {
    panic::catch_unwind(AssertUnwindSafe(|| callback(ctx)))
        .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =========================================================================
// Tests
// =========================================================================

//! Domain-scoped task scheduling for Tickwork.
//!
//! Work is scheduled against a **domain** (one simulated world, say) and a
//! tick, and runs when the embedder processes that domain:
//!
//! 1. **Scheduling**: [`TaskRegistry::schedule_delayed`] (one-shot) and
//!    [`TaskRegistry::schedule_periodic`] hand back an opaque [`TaskId`].
//! 2. **Processing**: [`TaskRegistry::process_domain`] is the only
//!    tick-driven entry point. It runs every due task of one domain and
//!    returns a [`ProcessingReport`].
//! 3. **Teardown**: [`TaskRegistry::cancel`] for one task,
//!    [`TaskRegistry::clear_domain`] when a domain goes away.
//!
//! # Task lifecycle
//!
//! ```text
//! schedule_*() ──→ Scheduled ──(due)──→ Executing ──┬──→ Retired
//!                     ↑                              │
//!                     └──────── (periodic) ──────────┘
//!
//! cancel() / clear_domain(): Scheduled → Cancelled, at any time
//! ```
//!
//! # Threading
//!
//! The registry is `Sync`. Introspection (`is_scheduled`, `task_count`) can
//! run from any thread at any time. Different domains may be processed on
//! different threads concurrently; one domain must not be processed by two
//! callers at once.

mod config;
mod error;
mod index;
mod registry;
mod report;
mod task;

pub use config::SchedulerConfig;
pub use error::TaskError;
pub use registry::{TaskCallback, TaskRegistry};
pub use report::{ProcessingReport, SchedulerMetrics};
pub use task::{TaskId, TaskInfo, TaskState};
pub use tickwork_clock::Tick;

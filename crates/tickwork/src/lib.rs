//! # Tickwork
//!
//! Tick-driven cooldowns and domain-scoped task scheduling for simulations
//! and game servers.
//!
//! Everything runs on logical ticks supplied by the caller; nothing here
//! reads a wall clock except the optional [`spawn_domain_loop`] driver.
//!
//! - [`CooldownStore`]: per-actor ability cooldowns, pruned lazily on read.
//! - [`TaskRegistry`]: delayed and periodic tasks bound to a domain, run by
//!   processing that domain.
//! - [`Engine`]: both of the above behind one handle.
//! - [`spawn_domain_loop`]: a tokio task that paces one domain with a
//!   [`TickPacer`] and steps the engine every tick.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tickwork::prelude::*;
//!
//! # async fn run() -> Result<(), TickworkError> {
//! let engine: Arc<Engine<&'static str, u64, ()>> = Arc::new(Engine::default());
//! let arena = spawn_domain_loop(Arc::clone(&engine), "arena", (), DomainLoopConfig::default());
//!
//! engine.tasks().schedule_periodic(
//!     "arena",
//!     |_: &()| Ok(()),
//!     0,
//!     20,
//!     None,
//!     arena.now(),
//! )?;
//!
//! if engine.cooldowns().try_start(42, "fireball", 100, arena.now()) {
//!     // cast it
//! }
//! arena.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod driver;
mod engine;
mod error;
mod telemetry;

pub use config::EngineConfig;
pub use driver::{
    DomainClock, DomainLoopConfig, DomainLoopHandle, DomainLoopStatus, spawn_domain_loop,
};
pub use engine::Engine;
pub use error::{DriverError, TickworkError};
pub use telemetry::init_tracing;

pub use tickwork_clock::{ActorKey, ClockError, DomainKey, ManualClock, Tick, TickClock};
pub use tickwork_cooldown::{CooldownConfig, CooldownEntry, CooldownStore, SweepReport};
pub use tickwork_pacer::{OverrunPolicy, PacedTick, PacerConfig, PacerMetrics, TickPacer};
pub use tickwork_scheduler::{
    ProcessingReport, SchedulerConfig, SchedulerMetrics, TaskCallback, TaskError, TaskId,
    TaskInfo, TaskRegistry, TaskState,
};

/// Convenience re-exports for the common case.
pub mod prelude {
    pub use crate::{
        DomainLoopConfig, DomainLoopHandle, Engine, EngineConfig, ProcessingReport, TaskError,
        TaskId, Tick, TickClock, TickworkError, spawn_domain_loop,
    };
}

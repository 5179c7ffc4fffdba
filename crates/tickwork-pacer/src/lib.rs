//! Fixed-timestep pacing for Tickwork domains.
//!
//! The cooldown store and task registry only ever see logical ticks; they
//! never read a clock. [`TickPacer`] is the piece that turns wall-clock
//! time into those ticks for one domain: a configurable rate (1–128 Hz),
//! overrun detection with a [`OverrunPolicy`], budget monitoring and
//! pause/resume.
//!
//! Any other tick source works just as well (a turn counter, a replay
//! log). This one is what the `tickwork` domain loop uses.

mod config;
mod pacer;

pub use config::{OverrunPolicy, PacerConfig};
pub use pacer::{PacedTick, PacerMetrics, TickPacer};
pub use tickwork_clock::Tick;

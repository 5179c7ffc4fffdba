//! Shared time and identity abstractions for Tickwork.
//!
//! Nothing in Tickwork owns real time. Every operation takes the current
//! logical tick (`now`) from the caller, and everything is keyed by opaque
//! identifiers the embedder chooses:
//!
//! - a **domain** ([`DomainKey`]) is a logical scope such as one simulated
//!   world; scheduled tasks are bound to exactly one domain.
//! - an **actor** ([`ActorKey`]) is the subject of a cooldown, such as a
//!   player.
//!
//! [`TickClock`] is the seam through which an embedder exposes its per-domain
//! tick counters. [`ManualClock`] is a concurrent implementation that is
//! handy for tests and for drivers that advance ticks by hand.

mod clock;
mod error;

pub use clock::{ManualClock, TickClock};
pub use error::ClockError;

use std::fmt::Debug;
use std::hash::Hash;

/// One discrete step of an external monotonic clock.
///
/// Signed so that differences (`now - start`) never underflow, even when a
/// caller hands in a tick from before a domain was recreated.
pub type Tick = i64;

/// Requirements for a domain identifier.
///
/// Any hashable, comparable value works: a world name, a dimension key, a
/// numeric id. Blanket-implemented, so there is nothing to derive.
pub trait DomainKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> DomainKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Requirements for an actor identifier.
///
/// The engine never looks inside an actor key; it only hashes and compares
/// it.
pub trait ActorKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> ActorKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

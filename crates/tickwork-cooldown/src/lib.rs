//! Actor-keyed cooldown tracking for Tickwork.
//!
//! A cooldown answers one question: "is ability X unavailable to actor Y
//! right now?" The [`CooldownStore`] keeps one [`CooldownEntry`] per
//! `(actor, ability)` pair and computes everything from the `now` tick the
//! caller passes in. It has no clock of its own and needs no per-tick call.
//!
//! # Lazy expiry
//!
//! Expired entries are not removed by a timer. Every read path that finds
//! an expired entry deletes it on the spot, so steady-state memory tracks
//! the cooldowns that are *currently* active. For actors that are never
//! read again, [`CooldownStore::sweep_expired`] (or the interval-gated
//! [`CooldownStore::maybe_sweep`]) walks the whole store.
//!
//! # Concurrency
//!
//! The store is `Sync` and meant to be shared (`Arc<CooldownStore<_>>`).
//! Actors live in a sharded map; a lookup only contends with writers that
//! hash to the same shard, and entries are replaced as whole values.

mod config;
mod entry;
mod store;

pub use config::CooldownConfig;
pub use entry::CooldownEntry;
pub use store::{CooldownStore, SweepReport};
pub use tickwork_clock::Tick;

//! The cooldown store: every active cooldown, keyed by actor then ability.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tickwork_clock::{ActorKey, Tick};
use tracing::{debug, trace};

use crate::{CooldownConfig, CooldownEntry};

/// Sentinel for "no sweep has run yet".
const NEVER_SWEPT: Tick = Tick::MIN;

/// What a full sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired entries deleted.
    pub entries_removed: usize,
    /// Actors dropped because they had no entries left.
    pub actors_removed: usize,
}

/// Tracks which abilities are on cooldown for which actors.
///
/// ## Lifecycle of an entry
///
/// ```text
/// set_cooldown() ──→ [active] ──(now >= start + duration)──→ [expired]
///       ↑               │                                       │
///       └─(overwrite)───┘                 next read / sweep ────┘──→ removed
///
/// clear() / clear_all() remove entries at any time.
/// ```
///
/// An expired entry may still sit in memory until something looks at it,
/// but every read treats it as absent.
pub struct CooldownStore<A: ActorKey> {
    /// Per-actor ability maps.
    ///
    /// The outer map is sharded, so unrelated actors rarely contend. An
    /// actor's inner map is only touched while holding that actor's shard
    /// lock, which is why entries are never observed half-written.
    actors: DashMap<A, HashMap<String, CooldownEntry>>,

    config: CooldownConfig,

    /// Tick of the last interval-gated sweep, or [`NEVER_SWEPT`].
    last_sweep: AtomicI64,
}

impl<A: ActorKey> CooldownStore<A> {
    /// Creates an empty store.
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            actors: DashMap::new(),
            config: config.validated(),
            last_sweep: AtomicI64::new(NEVER_SWEPT),
        }
    }

    /// The store's (validated) configuration.
    pub fn config(&self) -> &CooldownConfig {
        &self.config
    }

    /// Starts a cooldown of `duration_ticks` for `ability`, beginning at
    /// `now`.
    ///
    /// Overwrites any existing cooldown for the same ability: the last call
    /// wins, durations never stack. A duration `<= 0` leaves the ability
    /// ready, so it removes any existing entry instead of storing one.
    pub fn set_cooldown(&self, actor: A, ability: impl Into<String>, duration_ticks: Tick, now: Tick) {
        let ability = ability.into();
        if duration_ticks <= 0 {
            self.clear(&actor, &ability);
            return;
        }

        debug!(?actor, ability = %ability, duration = duration_ticks, tick = now, "cooldown set");
        let entry = CooldownEntry::new(ability.clone(), now, duration_ticks);
        self.actors.entry(actor).or_default().insert(ability, entry);
    }

    /// Starts the cooldown only if the ability is ready.
    ///
    /// Returns `true` if the ability was ready (and is now on cooldown),
    /// `false` if it was still cooling down, in which case the existing
    /// entry is untouched. The check and the write happen under one lock,
    /// so two concurrent callers can never both succeed.
    pub fn try_start(&self, actor: A, ability: impl Into<String>, duration_ticks: Tick, now: Tick) -> bool {
        let ability = ability.into();
        let emptied = {
            let mut abilities = self.actors.entry(actor.clone()).or_default();
            if abilities
                .get(&ability)
                .is_some_and(|entry| !entry.is_expired(now))
            {
                return false;
            }
            if duration_ticks > 0 {
                debug!(?actor, ability = %ability, duration = duration_ticks, tick = now, "cooldown started");
                let entry = CooldownEntry::new(ability.clone(), now, duration_ticks);
                abilities.insert(ability, entry);
            } else {
                abilities.remove(&ability);
            }
            abilities.is_empty()
        };
        if emptied {
            self.drop_if_empty(&actor);
        }
        true
    }

    /// `true` iff `ability` has a cooldown with time remaining at `now`.
    ///
    /// An expired entry found here is removed before returning `false`.
    pub fn is_on_cooldown(&self, actor: &A, ability: &str, now: Tick) -> bool {
        self.live_entry(actor, ability, now).is_some()
    }

    /// Ticks left on the cooldown, or 0 if there is none (pruning an
    /// expired entry on the way).
    pub fn remaining(&self, actor: &A, ability: &str, now: Tick) -> Tick {
        self.live_entry(actor, ability, now)
            .map_or(0, |entry| entry.remaining(now))
    }

    /// Elapsed fraction of the cooldown, or `1.0` if there is none
    /// (pruning an expired entry on the way).
    pub fn progress(&self, actor: &A, ability: &str, now: Tick) -> f32 {
        self.live_entry(actor, ability, now)
            .map_or(1.0, |entry| entry.progress(now))
    }

    /// Removes one cooldown. Returns `true` if an entry existed.
    ///
    /// An entry that had already expired but was not yet pruned still
    /// counts as existing here.
    pub fn clear(&self, actor: &A, ability: &str) -> bool {
        let (removed, emptied) = match self.actors.get_mut(actor) {
            Some(mut abilities) => {
                let removed = abilities.remove(ability).is_some();
                (removed, abilities.is_empty())
            }
            None => return false,
        };
        if emptied {
            self.drop_if_empty(actor);
        }
        if removed {
            debug!(?actor, ability, "cooldown cleared");
        }
        removed
    }

    /// Removes every cooldown of `actor`. Call on actor teardown.
    ///
    /// Idempotent, and a single map lookup when the actor has nothing.
    pub fn clear_all(&self, actor: &A) {
        if let Some((_, abilities)) = self.actors.remove(actor) {
            debug!(?actor, count = abilities.len(), "all cooldowns cleared");
        }
    }

    /// Snapshot of every active cooldown of `actor` as ability → remaining
    /// ticks. Prunes all of the actor's expired entries.
    pub fn active_cooldowns(&self, actor: &A, now: Tick) -> HashMap<String, Tick> {
        let (active, emptied) = {
            let Some(mut abilities) = self.actors.get_mut(actor) else {
                return HashMap::new();
            };
            let before = abilities.len();
            abilities.retain(|_, entry| !entry.is_expired(now));
            let pruned = before - abilities.len();
            if pruned > 0 {
                trace!(?actor, pruned, tick = now, "expired cooldowns pruned");
            }
            let active = abilities
                .iter()
                .map(|(ability, entry)| (ability.clone(), entry.remaining(now)))
                .collect();
            (active, abilities.is_empty())
        };
        if emptied {
            self.drop_if_empty(actor);
        }
        active
    }

    /// Walks every actor, removes expired entries, and drops actors that
    /// end up with none.
    ///
    /// Bounds memory for actors whose cooldowns are never read again.
    /// Cost is proportional to the whole store, so call it occasionally,
    /// not every tick.
    pub fn sweep_expired(&self, now: Tick) -> SweepReport {
        let mut report = SweepReport::default();
        self.actors.retain(|_, abilities| {
            let before = abilities.len();
            abilities.retain(|_, entry| !entry.is_expired(now));
            report.entries_removed += before - abilities.len();
            if abilities.is_empty() {
                report.actors_removed += 1;
                false
            } else {
                true
            }
        });
        debug!(
            tick = now,
            entries = report.entries_removed,
            actors = report.actors_removed,
            "cooldown sweep finished"
        );
        report
    }

    /// Runs [`sweep_expired`](Self::sweep_expired) if at least
    /// `sweep_interval_ticks` have passed since the last interval sweep.
    ///
    /// The first call always sweeps. A `now` earlier than the last sweep
    /// (the clock was reset) also sweeps and restarts the interval. When
    /// several threads call this at once, only one of them sweeps.
    pub fn maybe_sweep(&self, now: Tick) -> Option<SweepReport> {
        let interval = self.config.sweep_interval_ticks;
        if interval <= 0 {
            return None;
        }
        let last = self.last_sweep.load(Ordering::Acquire);
        let due = last == NEVER_SWEPT || now < last || now.saturating_sub(last) >= interval;
        if !due {
            return None;
        }
        self.last_sweep
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(self.sweep_expired(now))
    }

    /// Number of actors with at least one stored entry.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Number of entries stored for `actor`, including expired entries
    /// that have not been pruned yet.
    pub fn entry_count(&self, actor: &A) -> usize {
        self.actors.get(actor).map_or(0, |abilities| abilities.len())
    }

    /// `true` if no actor has any stored entry.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Returns a copy of the entry if it exists and has not expired.
    /// An expired entry is pruned.
    fn live_entry(&self, actor: &A, ability: &str, now: Tick) -> Option<CooldownEntry> {
        {
            let abilities = self.actors.get(actor)?;
            let entry = abilities.get(ability)?;
            if !entry.is_expired(now) {
                return Some(entry.clone());
            }
        }
        self.prune(actor, ability, now);
        None
    }

    /// Deletes `ability` for `actor` if it is (still) expired at `now`.
    fn prune(&self, actor: &A, ability: &str, now: Tick) {
        let emptied = match self.actors.get_mut(actor) {
            Some(mut abilities) => {
                // Re-check under the write lock: a set_cooldown may have
                // replaced the entry since the read.
                if abilities
                    .get(ability)
                    .is_some_and(|entry| entry.is_expired(now))
                {
                    abilities.remove(ability);
                    trace!(?actor, ability, tick = now, "expired cooldown pruned");
                }
                abilities.is_empty()
            }
            None => false,
        };
        if emptied {
            self.drop_if_empty(actor);
        }
    }

    /// Removes the actor's map if it is still empty. Must be called with
    /// no guard into `actors` held.
    fn drop_if_empty(&self, actor: &A) {
        self.actors
            .remove_if(actor, |_, abilities| abilities.is_empty());
    }
}

impl<A: ActorKey> Default for CooldownStore<A> {
    fn default() -> Self {
        Self::new(CooldownConfig::default())
    }
}

impl<A: ActorKey> std::fmt::Debug for CooldownStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownStore")
            .field("actors", &self.actors.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `CooldownStore`.
    //!
    //! Naming: `test_{function}_{scenario}_{expected}`. Ticks are plain
    //! integers; no test depends on wall-clock time.

    use super::*;

    fn store() -> CooldownStore<&'static str> {
        CooldownStore::default()
    }

    // =====================================================================
    // set_cooldown()
    // =====================================================================

    #[test]
    fn test_set_cooldown_new_entry_is_active() {
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 0);

        assert!(store.is_on_cooldown(&"p1", "fireball", 0));
        assert_eq!(store.remaining(&"p1", "fireball", 0), 100);
        assert_eq!(store.entry_count(&"p1"), 1);
    }

    #[test]
    fn test_set_cooldown_overwrites_instead_of_stacking() {
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 10);
        store.set_cooldown("p1", "fireball", 30, 10);

        assert_eq!(store.remaining(&"p1", "fireball", 10), 30);
        assert_eq!(store.entry_count(&"p1"), 1);
    }

    #[test]
    fn test_set_cooldown_shorter_overwrite_wins() {
        // Overwrite is unconditional, even when it shortens the cooldown.
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 0);
        store.set_cooldown("p1", "fireball", 5, 50);

        assert_eq!(store.remaining(&"p1", "fireball", 50), 5);
        assert!(!store.is_on_cooldown(&"p1", "fireball", 55));
    }

    #[test]
    fn test_set_cooldown_negative_duration_acts_as_clear() {
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 0);

        store.set_cooldown("p1", "fireball", -10, 5);

        assert!(!store.is_on_cooldown(&"p1", "fireball", 5));
        assert_eq!(store.entry_count(&"p1"), 0);
        assert!(store.is_empty(), "empty actor should not linger");
    }

    #[test]
    fn test_set_cooldown_zero_duration_never_stores() {
        let store = store();
        store.set_cooldown("p1", "fireball", 0, 5);
        assert!(store.is_empty());
    }

    // =====================================================================
    // try_start()
    // =====================================================================

    #[test]
    fn test_try_start_ready_ability_starts_cooldown() {
        let store = store();

        assert!(store.try_start("p1", "dash", 20, 0));
        assert_eq!(store.remaining(&"p1", "dash", 5), 15);
    }

    #[test]
    fn test_try_start_on_cooldown_leaves_entry_untouched() {
        let store = store();
        store.set_cooldown("p1", "dash", 20, 0);

        assert!(!store.try_start("p1", "dash", 500, 10));
        assert_eq!(store.remaining(&"p1", "dash", 10), 10);
    }

    #[test]
    fn test_try_start_after_expiry_restarts() {
        let store = store();
        store.set_cooldown("p1", "dash", 20, 0);

        assert!(store.try_start("p1", "dash", 20, 20));
        assert_eq!(store.remaining(&"p1", "dash", 20), 20);
    }

    #[test]
    fn test_try_start_zero_duration_succeeds_without_storing() {
        let store = store();
        assert!(store.try_start("p1", "dash", 0, 0));
        assert!(store.is_empty());
    }

    // =====================================================================
    // Read paths and lazy pruning
    // =====================================================================

    #[test]
    fn test_is_on_cooldown_expired_prunes_entry() {
        let store = store();
        store.set_cooldown("p1", "fireball", 10, 0);
        store.set_cooldown("p1", "frost", 100, 0);
        assert_eq!(store.entry_count(&"p1"), 2);

        assert!(!store.is_on_cooldown(&"p1", "fireball", 10));

        assert_eq!(store.entry_count(&"p1"), 1, "expired entry should be gone");
    }

    #[test]
    fn test_remaining_expired_last_entry_drops_actor() {
        let store = store();
        store.set_cooldown("p1", "fireball", 10, 0);

        assert_eq!(store.remaining(&"p1", "fireball", 11), 0);

        assert_eq!(store.actor_count(), 0);
    }

    #[test]
    fn test_progress_unknown_is_complete() {
        let store = store();
        assert_eq!(store.progress(&"ghost", "fireball", 0), 1.0);
    }

    #[test]
    fn test_progress_expired_prunes_and_reports_complete() {
        let store = store();
        store.set_cooldown("p1", "fireball", 10, 0);

        assert_eq!(store.progress(&"p1", "fireball", 10), 1.0);
        assert_eq!(store.entry_count(&"p1"), 0);
    }

    #[test]
    fn test_unknown_actor_reads_are_not_errors() {
        let store = store();
        assert!(!store.is_on_cooldown(&"ghost", "fireball", 0));
        assert_eq!(store.remaining(&"ghost", "fireball", 0), 0);
        assert!(store.active_cooldowns(&"ghost", 0).is_empty());
    }

    // =====================================================================
    // clear() / clear_all()
    // =====================================================================

    #[test]
    fn test_clear_existing_returns_true_once() {
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 0);

        assert!(store.clear(&"p1", "fireball"));
        assert!(!store.clear(&"p1", "fireball"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_leaves_other_abilities() {
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 0);
        store.set_cooldown("p1", "frost", 100, 0);

        store.clear(&"p1", "fireball");

        assert!(store.is_on_cooldown(&"p1", "frost", 1));
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let store = store();
        store.set_cooldown("p1", "fireball", 100, 0);
        store.set_cooldown("p1", "frost", 100, 0);
        store.set_cooldown("p2", "frost", 100, 0);

        store.clear_all(&"p1");
        store.clear_all(&"p1");
        store.clear_all(&"nobody");

        assert_eq!(store.entry_count(&"p1"), 0);
        assert!(store.is_on_cooldown(&"p2", "frost", 1));
    }

    // =====================================================================
    // active_cooldowns()
    // =====================================================================

    #[test]
    fn test_active_cooldowns_snapshot_and_prune() {
        let store = store();
        store.set_cooldown("p1", "fireball", 10, 0);
        store.set_cooldown("p1", "frost", 50, 0);
        store.set_cooldown("p1", "shield", 200, 0);

        let active = store.active_cooldowns(&"p1", 20);

        assert_eq!(active.len(), 2);
        assert_eq!(active.get("frost"), Some(&30));
        assert_eq!(active.get("shield"), Some(&180));
        assert_eq!(store.entry_count(&"p1"), 2);
    }

    // =====================================================================
    // sweep_expired() / maybe_sweep()
    // =====================================================================

    #[test]
    fn test_sweep_expired_removes_entries_and_empty_actors() {
        let store = store();
        store.set_cooldown("p1", "fireball", 10, 0);
        store.set_cooldown("p2", "fireball", 10, 0);
        store.set_cooldown("p2", "shield", 100, 0);

        let report = store.sweep_expired(50);

        assert_eq!(
            report,
            SweepReport {
                entries_removed: 2,
                actors_removed: 1
            }
        );
        assert_eq!(store.actor_count(), 1);
        assert_eq!(store.entry_count(&"p2"), 1);
    }

    #[test]
    fn test_maybe_sweep_respects_interval() {
        let store = CooldownStore::new(CooldownConfig {
            sweep_interval_ticks: 100,
        });
        store.set_cooldown("p1", "fireball", 10, 0);

        assert!(store.maybe_sweep(0).is_some(), "first call sweeps");
        assert!(store.maybe_sweep(50).is_none());
        let report = store.maybe_sweep(100).expect("interval elapsed");

        assert_eq!(report.entries_removed, 1);
        assert!(store.maybe_sweep(150).is_none());
    }

    #[test]
    fn test_maybe_sweep_clock_reset_sweeps() {
        let store = CooldownStore::new(CooldownConfig {
            sweep_interval_ticks: 100,
        });
        store.set_cooldown("p1", "fireball", 10, 0);
        assert!(store.maybe_sweep(500).is_some());

        assert!(store.maybe_sweep(20).is_some());
        assert!(store.maybe_sweep(60).is_none());
    }

    #[test]
    fn test_maybe_sweep_disabled_never_sweeps() {
        let store = CooldownStore::new(CooldownConfig {
            sweep_interval_ticks: 0,
        });
        store.set_cooldown("p1", "fireball", 10, 0);

        assert!(store.maybe_sweep(10_000).is_none());
        assert_eq!(store.entry_count(&"p1"), 1);
    }
}

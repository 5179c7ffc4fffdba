//! A single cooldown and the arithmetic derived from it.

use tickwork_clock::Tick;

/// One ability's cooldown for one actor.
///
/// Only the start tick and the duration are stored. `remaining` and
/// `progress` are recomputed from `now` on every call, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownEntry {
    ability_key: String,
    start_tick: Tick,
    duration_ticks: Tick,
}

impl CooldownEntry {
    /// Creates an entry starting at `start_tick`. Negative durations are
    /// clamped to 0.
    pub fn new(ability_key: impl Into<String>, start_tick: Tick, duration_ticks: Tick) -> Self {
        Self {
            ability_key: ability_key.into(),
            start_tick,
            duration_ticks: duration_ticks.max(0),
        }
    }

    /// The ability this cooldown belongs to.
    pub fn ability_key(&self) -> &str {
        &self.ability_key
    }

    /// The tick the cooldown started at.
    pub fn start_tick(&self) -> Tick {
        self.start_tick
    }

    /// Total length of the cooldown.
    pub fn duration_ticks(&self) -> Tick {
        self.duration_ticks
    }

    /// The first tick at which the cooldown is over.
    pub fn expires_at(&self) -> Tick {
        self.start_tick.saturating_add(self.duration_ticks)
    }

    /// Ticks left at `now`; never negative.
    ///
    /// `max(0, duration - (now - start))`.
    pub fn remaining(&self, now: Tick) -> Tick {
        let elapsed = now.saturating_sub(self.start_tick);
        self.duration_ticks.saturating_sub(elapsed).max(0)
    }

    /// Fraction of the cooldown that has elapsed at `now`, in `0.0..=1.0`.
    ///
    /// A zero-length cooldown is always complete (`1.0`).
    pub fn progress(&self, now: Tick) -> f32 {
        if self.duration_ticks <= 0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start_tick);
        (elapsed as f64 / self.duration_ticks as f64).clamp(0.0, 1.0) as f32
    }

    /// `true` once nothing remains. Expired entries are logically absent.
    pub fn is_expired(&self, now: Tick) -> bool {
        self.remaining(now) <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_counts_down_to_zero() {
        let entry = CooldownEntry::new("fireball", 0, 100);
        assert_eq!(entry.remaining(0), 100);
        assert_eq!(entry.remaining(30), 70);
        assert_eq!(entry.remaining(100), 0);
        assert_eq!(entry.remaining(250), 0);
    }

    #[test]
    fn test_remaining_before_start_exceeds_duration() {
        // A caller passing a tick from before the start sees more than the
        // full duration left, never a wrapped value.
        let entry = CooldownEntry::new("fireball", 50, 10);
        assert_eq!(entry.remaining(40), 20);
    }

    #[test]
    fn test_progress_is_clamped() {
        let entry = CooldownEntry::new("fireball", 100, 100);
        assert_eq!(entry.progress(50), 0.0);
        assert_eq!(entry.progress(100), 0.0);
        assert!((entry.progress(150) - 0.5).abs() < f32::EPSILON);
        assert_eq!(entry.progress(200), 1.0);
        assert_eq!(entry.progress(10_000), 1.0);
    }

    #[test]
    fn test_zero_duration_is_complete() {
        let entry = CooldownEntry::new("blink", 10, 0);
        assert_eq!(entry.progress(10), 1.0);
        assert!(entry.is_expired(10));
    }

    #[test]
    fn test_new_negative_duration_clamped() {
        let entry = CooldownEntry::new("blink", 10, -5);
        assert_eq!(entry.duration_ticks(), 0);
        assert_eq!(entry.expires_at(), 10);
    }

    #[test]
    fn test_extreme_ticks_do_not_overflow() {
        let entry = CooldownEntry::new("blink", i64::MIN, i64::MAX);
        assert_eq!(entry.remaining(i64::MAX), 0);
        assert_eq!(entry.expires_at(), -1);
    }
}

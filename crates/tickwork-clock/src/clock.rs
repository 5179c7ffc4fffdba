//! Clock sources: where `now` comes from.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use crate::{ClockError, DomainKey, Tick};

/// Supplies the current tick for a domain.
///
/// Implementations must be monotonic per domain: successive calls for the
/// same domain never return a smaller tick, unless the domain was torn down
/// and recreated in between. Returns `None` for a domain the clock does not
/// know about.
pub trait TickClock<D> {
    /// The current tick of `domain`, if the domain exists.
    fn now(&self, domain: &D) -> Option<Tick>;
}

/// A clock whose ticks are moved forward explicitly.
///
/// Per-domain counters live in a sharded concurrent map, so reading one
/// domain's tick never waits on another domain being advanced.
#[derive(Debug)]
pub struct ManualClock<D: DomainKey> {
    ticks: DashMap<D, Tick>,
}

impl<D: DomainKey> ManualClock<D> {
    /// Creates a clock with no domains.
    pub fn new() -> Self {
        Self {
            ticks: DashMap::new(),
        }
    }

    /// Creates `domain` at tick 0.
    ///
    /// If the domain already exists it is reset to 0. This is the only way
    /// a domain's tick moves backwards.
    pub fn create_domain(&self, domain: D) {
        debug!(?domain, "clock domain created");
        self.ticks.insert(domain, 0);
    }

    /// Removes `domain`. Returns `true` if it existed.
    pub fn remove_domain(&self, domain: &D) -> bool {
        self.ticks.remove(domain).is_some()
    }

    /// Moves `domain` forward by `by` ticks and returns the new tick.
    ///
    /// # Errors
    /// - [`ClockError::NegativeStep`] if `by < 0`.
    /// - [`ClockError::UnknownDomain`] if the domain does not exist.
    pub fn advance(&self, domain: &D, by: Tick) -> Result<Tick, ClockError> {
        if by < 0 {
            return Err(ClockError::NegativeStep(by));
        }
        let mut tick = self
            .ticks
            .get_mut(domain)
            .ok_or_else(|| ClockError::UnknownDomain(format!("{domain:?}")))?;
        *tick = tick.saturating_add(by);
        trace!(?domain, tick = *tick, "clock advanced");
        Ok(*tick)
    }

    /// Sets `domain` to `tick`.
    ///
    /// # Errors
    /// - [`ClockError::Regressed`] if `tick` is earlier than the current tick.
    /// - [`ClockError::UnknownDomain`] if the domain does not exist.
    pub fn set(&self, domain: &D, tick: Tick) -> Result<(), ClockError> {
        match self.ticks.entry(domain.clone()) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if tick < current {
                    return Err(ClockError::Regressed {
                        current,
                        requested: tick,
                    });
                }
                entry.insert(tick);
                Ok(())
            }
            Entry::Vacant(_) => Err(ClockError::UnknownDomain(format!("{domain:?}"))),
        }
    }

    /// Lists every known domain.
    pub fn domains(&self) -> Vec<D> {
        self.ticks.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl<D: DomainKey> Default for ManualClock<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DomainKey> TickClock<D> for ManualClock<D> {
    fn now(&self, domain: &D) -> Option<Tick> {
        self.ticks.get(domain).map(|tick| *tick)
    }
}

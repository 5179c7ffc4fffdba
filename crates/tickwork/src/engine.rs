//! The engine: one cooldown store and one task registry, side by side.

use tickwork_clock::{ActorKey, DomainKey, Tick};
use tickwork_cooldown::{CooldownStore, SweepReport};
use tickwork_scheduler::{ProcessingReport, TaskRegistry};
use tracing::{debug, info};

use crate::EngineConfig;

/// Owns the cooldown store and the task registry for one embedding.
///
/// There is no global instance; create as many engines as you need (one
/// per test, one per shard of a server). An engine is `Sync`: share it
/// behind an `Arc` between domain loops and request handlers.
///
/// - `D`: domain key (a world id, a match id).
/// - `A`: actor key for cooldowns (a player id).
/// - `C`: the context handed to task callbacks when a domain is stepped.
pub struct Engine<D: DomainKey, A: ActorKey, C> {
    cooldowns: CooldownStore<A>,
    tasks: TaskRegistry<D, C>,
    config: EngineConfig,
}

impl<D: DomainKey, A: ActorKey, C> Engine<D, A, C> {
    /// Creates an engine from `config`, clamping out-of-range values first.
    pub fn new(config: EngineConfig) -> Self {
        let config = config.validated();
        debug!(?config, "engine created");
        Self {
            cooldowns: CooldownStore::new(config.cooldowns.clone()),
            tasks: TaskRegistry::new(config.scheduler.clone()),
            config,
        }
    }

    /// The cooldown store.
    pub fn cooldowns(&self) -> &CooldownStore<A> {
        &self.cooldowns
    }

    /// The task registry.
    pub fn tasks(&self) -> &TaskRegistry<D, C> {
        &self.tasks
    }

    /// The validated config the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Advances one domain to `now`: runs every task of `domain` that is due.
    pub fn step(&self, domain: &D, ctx: &C, now: Tick) -> ProcessingReport {
        self.tasks.process_domain(domain, ctx, now)
    }

    /// Interval-gated sweep of expired cooldowns. Cheap to call every tick.
    pub fn sweep_cooldowns(&self, now: Tick) -> Option<SweepReport> {
        self.cooldowns.maybe_sweep(now)
    }

    /// Drops every task bound to `domain`. Returns how many were removed.
    pub fn teardown_domain(&self, domain: &D) -> usize {
        let removed = self.tasks.clear_domain(domain);
        info!(?domain, tasks_removed = removed, "domain torn down");
        removed
    }

    /// Drops every cooldown of `actor`.
    pub fn teardown_actor(&self, actor: &A) {
        self.cooldowns.clear_all(actor);
    }
}

impl<D: DomainKey, A: ActorKey, C> Default for Engine<D, A, C> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<D: DomainKey, A: ActorKey, C> std::fmt::Debug for Engine<D, A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cooldowns", &self.cooldowns)
            .field("tasks", &self.tasks)
            .finish()
    }
}

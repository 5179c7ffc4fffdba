use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tickwork::prelude::*;
use tickwork::init_tracing;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum World {
    Arena,
    Lobby,
}

/// Per-world state handed to every task callback of that world.
struct WorldState {
    health: Mutex<HashMap<PlayerId, i64>>,
}

impl WorldState {
    fn new(players: &[PlayerId]) -> Arc<Self> {
        Arc::new(Self {
            health: Mutex::new(players.iter().map(|&p| (p, 100)).collect()),
        })
    }

    fn adjust(&self, player: Option<PlayerId>, delta: i64) -> Result<(), TaskError> {
        let mut health = self
            .health
            .lock()
            .map_err(|_| TaskError::failed("world state lock poisoned"))?;
        for (id, hp) in health.iter_mut() {
            if player.is_none_or(|p| p == *id) {
                *hp = (*hp + delta).clamp(0, 100);
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> HashMap<PlayerId, i64> {
        self.health
            .lock()
            .map(|health| health.clone())
            .unwrap_or_default()
    }
}

type ArenaEngine = Engine<World, PlayerId, Arc<WorldState>>;

const CONFIG: &str = r#"{
    "pacer": { "tick_rate_hz": 20 },
    "cooldowns": { "sweep_interval_ticks": 100 }
}"#;

const FIREBALL_COOLDOWN: Tick = 30;
const FIREBALL_DAMAGE: i64 = 12;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), TickworkError> {
    init_tracing("info,tickwork_scheduler=debug");

    let config = EngineConfig::from_json_str(CONFIG)?;
    let engine: Arc<ArenaEngine> = Arc::new(Engine::new(config.clone()));

    let arena_state = WorldState::new(&[1, 2]);
    let lobby_state = WorldState::new(&[3]);

    // Cooldowns are measured in arena ticks, so the arena loop sweeps them.
    let mut arena = spawn_domain_loop(
        Arc::clone(&engine),
        World::Arena,
        Arc::clone(&arena_state),
        DomainLoopConfig {
            sweep_cooldowns: true,
            ..DomainLoopConfig::from_engine(&config)
        },
    );
    let lobby = spawn_domain_loop(
        Arc::clone(&engine),
        World::Lobby,
        Arc::clone(&lobby_state),
        DomainLoopConfig::from_engine(&config),
    );

    // Poison cloud: everyone in the arena takes 5 damage every 10 ticks, six times.
    engine.tasks().schedule_periodic(
        World::Arena,
        |world: &Arc<WorldState>| world.adjust(None, -5),
        10,
        10,
        Some(6),
        arena.now(),
    )?;
    // The lobby slowly heals whoever is in it, for as long as it exists.
    engine.tasks().schedule_periodic(
        World::Lobby,
        |world: &Arc<WorldState>| world.adjust(None, 1),
        0,
        20,
        None,
        lobby.now(),
    )?;
    // A boss that never finds room to spawn; shows up as a failure report.
    engine.tasks().schedule_delayed(
        World::Arena,
        |_: &Arc<WorldState>| Err(TaskError::failed("no free spawn point")),
        40,
        arena.now(),
    );

    // Both arena players mash fireball four times a second.
    let mut casts = 0u32;
    let mut blocked = 0u32;
    let mut input = tokio::time::interval(Duration::from_millis(250));
    for _ in 0..16 {
        input.tick().await;
        let now = arena.now();
        for (caster, target) in [(1, 2), (2, 1)] {
            if engine
                .cooldowns()
                .try_start(caster, "fireball", FIREBALL_COOLDOWN, now)
            {
                casts += 1;
                arena_state.adjust(Some(target), -FIREBALL_DAMAGE)?;
                info!(caster, target, tick = now, "fireball");
            } else {
                blocked += 1;
                let remaining = engine.cooldowns().remaining(&caster, "fireball", now);
                info!(caster, tick = now, remaining, "fireball on cooldown");
            }
        }

        while let Some(report) = arena.try_next_report() {
            for failure in &report.failures {
                warn!(tick = report.tick, error = %failure, "arena task failed");
            }
        }
    }

    let arena_status = arena.status().await?;
    let lobby_status = lobby.status().await?;
    info!(
        arena_tick = arena_status.tick,
        lobby_tick = lobby_status.tick,
        arena_tasks = arena_status.tasks,
        lobby_tasks = lobby_status.tasks,
        casts,
        blocked,
        "simulation finished"
    );
    info!(health = ?arena_state.snapshot(), "arena");
    info!(health = ?lobby_state.snapshot(), "lobby");
    info!(metrics = ?engine.tasks().metrics(), "scheduler");

    arena.shutdown().await?;
    lobby.shutdown().await?;
    for player in [1, 2, 3] {
        engine.teardown_actor(&player);
    }
    Ok(())
}

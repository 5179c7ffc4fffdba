//! Domain loop: a tokio task that paces one domain and steps it every tick.
//!
//! Each loop owns its domain's context and a [`TickPacer`], and talks to the
//! outside world through a command channel, the same actor shape as any
//! other long-lived tokio service. The engine itself is shared: many loops
//! (one per domain) step the same [`Engine`] concurrently.

use std::sync::Arc;

use tickwork_clock::{ActorKey, DomainKey, Tick, TickClock};
use tickwork_pacer::{PacedTick, PacerConfig, PacerMetrics, TickPacer};
use tickwork_scheduler::ProcessingReport;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{DriverError, Engine, EngineConfig};

/// Settings for [`spawn_domain_loop`].
#[derive(Debug, Clone)]
pub struct DomainLoopConfig {
    pub pacer: PacerConfig,
    /// Call [`Engine::sweep_cooldowns`] after every tick.
    ///
    /// The cooldown store has one time base. Enable this on the loop whose
    /// ticks your cooldowns are measured in, and on no other.
    pub sweep_cooldowns: bool,
    /// Capacity of the command channel.
    pub command_buffer: usize,
    /// Capacity of the failure report channel. Reports that do not fit are
    /// logged and dropped.
    pub report_buffer: usize,
}

impl Default for DomainLoopConfig {
    fn default() -> Self {
        Self {
            pacer: PacerConfig::default(),
            sweep_cooldowns: false,
            command_buffer: 32,
            report_buffer: 64,
        }
    }
}

impl DomainLoopConfig {
    /// Loop settings using the engine config's pacer section.
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            pacer: config.pacer.clone(),
            ..Self::default()
        }
    }
}

/// Snapshot of a running loop, from [`DomainLoopHandle::status`].
#[derive(Debug, Clone)]
pub struct DomainLoopStatus {
    /// Last tick the domain was stepped to, 0 before the first.
    pub tick: Tick,
    pub paused: bool,
    /// Tasks currently bound to the domain.
    pub tasks: usize,
    pub pacer: PacerMetrics,
}

enum LoopCommand {
    Pause,
    Resume,
    Status {
        reply: oneshot::Sender<DomainLoopStatus>,
    },
    /// Tear the domain down and stop. Replies with the number of tasks
    /// removed.
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

/// Read-only view of a loop's current tick.
///
/// Cheap to clone and usable from any thread, so request handlers can
/// schedule work "now" without going through the loop.
#[derive(Debug, Clone)]
pub struct DomainClock<D> {
    domain: D,
    ticks: watch::Receiver<Tick>,
}

impl<D> DomainClock<D> {
    /// Last published tick. Keeps the final value after the loop stops.
    pub fn current(&self) -> Tick {
        *self.ticks.borrow()
    }
}

impl<D: PartialEq> TickClock<D> for DomainClock<D> {
    /// `None` for any other domain, and once the loop has stopped.
    fn now(&self, domain: &D) -> Option<Tick> {
        if *domain != self.domain || self.ticks.has_changed().is_err() {
            return None;
        }
        Some(self.current())
    }
}

/// Owner's handle to a running domain loop.
///
/// Dropping the handle stops the loop, which tears its domain down just
/// like [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct DomainLoopHandle<D> {
    domain: D,
    commands: mpsc::Sender<LoopCommand>,
    clock: DomainClock<D>,
    reports: mpsc::Receiver<ProcessingReport>,
    task: JoinHandle<()>,
}

impl<D: DomainKey> DomainLoopHandle<D> {
    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Last tick the domain was stepped to.
    pub fn now(&self) -> Tick {
        self.clock.current()
    }

    /// A clonable clock following this loop.
    pub fn clock(&self) -> DomainClock<D> {
        self.clock.clone()
    }

    /// Stops ticking. Tasks stay scheduled; logical time stands still.
    pub async fn pause(&self) -> Result<(), DriverError> {
        self.send(LoopCommand::Pause).await
    }

    /// Resumes ticking. Time spent paused is not replayed.
    pub async fn resume(&self) -> Result<(), DriverError> {
        self.send(LoopCommand::Resume).await
    }

    pub async fn status(&self) -> Result<DomainLoopStatus, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoopCommand::Status { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Waits for the next report that contains callback failures. Returns
    /// `None` once the loop has stopped and every report was received.
    pub async fn next_report(&mut self) -> Option<ProcessingReport> {
        self.reports.recv().await
    }

    /// A failure report, if one is waiting.
    pub fn try_next_report(&mut self) -> Option<ProcessingReport> {
        self.reports.try_recv().ok()
    }

    /// Stops the loop and clears every task of its domain. Returns how many
    /// tasks were removed.
    pub async fn shutdown(self) -> Result<usize, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoopCommand::Shutdown { reply }).await?;
        let removed = rx.await.map_err(|_| self.unavailable())?;
        if let Err(err) = self.task.await {
            warn!(domain = ?self.domain, error = %err, "domain loop task ended abnormally");
        }
        Ok(removed)
    }

    async fn send(&self, cmd: LoopCommand) -> Result<(), DriverError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> DriverError {
        DriverError::Unavailable(format!("{:?}", self.domain))
    }
}

/// Spawns a loop that steps `domain` of `engine` once per pacer tick,
/// handing `ctx` to every callback.
///
/// Must be called from within a tokio runtime.
pub fn spawn_domain_loop<D, A, C>(
    engine: Arc<Engine<D, A, C>>,
    domain: D,
    ctx: C,
    config: DomainLoopConfig,
) -> DomainLoopHandle<D>
where
    D: DomainKey,
    A: ActorKey,
    C: Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
    let (report_tx, report_rx) = mpsc::channel(config.report_buffer.max(1));
    let (tick_tx, tick_rx) = watch::channel(0);

    let actor = DomainLoop {
        engine,
        domain: domain.clone(),
        ctx,
        pacer: TickPacer::new(config.pacer),
        sweep_cooldowns: config.sweep_cooldowns,
        commands: cmd_rx,
        ticks: tick_tx,
        reports: report_tx,
    };
    let task = tokio::spawn(actor.run());

    DomainLoopHandle {
        clock: DomainClock {
            domain: domain.clone(),
            ticks: tick_rx,
        },
        domain,
        commands: cmd_tx,
        reports: report_rx,
        task,
    }
}

/// The loop's state. Lives inside its tokio task.
struct DomainLoop<D: DomainKey, A: ActorKey, C> {
    engine: Arc<Engine<D, A, C>>,
    domain: D,
    ctx: C,
    pacer: TickPacer,
    sweep_cooldowns: bool,
    commands: mpsc::Receiver<LoopCommand>,
    ticks: watch::Sender<Tick>,
    reports: mpsc::Sender<ProcessingReport>,
}

impl<D: DomainKey, A: ActorKey, C> DomainLoop<D, A, C> {
    async fn run(mut self) {
        info!(domain = ?self.domain, rate_hz = self.pacer.config().tick_rate_hz, "domain loop started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(LoopCommand::Pause) => self.pacer.pause(),
                    Some(LoopCommand::Resume) => self.pacer.resume(),
                    Some(LoopCommand::Status { reply }) => {
                        let _ = reply.send(self.status());
                    }
                    Some(LoopCommand::Shutdown { reply }) => {
                        let removed = self.engine.teardown_domain(&self.domain);
                        let _ = reply.send(removed);
                        break;
                    }
                    None => {
                        debug!(domain = ?self.domain, "domain loop handle dropped");
                        self.engine.teardown_domain(&self.domain);
                        break;
                    }
                },
                paced = self.pacer.wait_for_tick() => self.on_tick(paced),
            }
        }

        info!(domain = ?self.domain, tick = self.pacer.current_tick(), "domain loop stopped");
    }

    fn on_tick(&mut self, paced: PacedTick) {
        let report = self.engine.step(&self.domain, &self.ctx, paced.tick);
        if self.sweep_cooldowns {
            self.engine.sweep_cooldowns(paced.tick);
        }
        self.pacer.record_tick_end();
        self.ticks.send_replace(paced.tick);

        if report.is_clean() {
            return;
        }
        match self.reports.try_send(report) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(report)) => {
                warn!(
                    domain = ?self.domain,
                    tick = paced.tick,
                    failures = report.failures.len(),
                    "report channel full, dropping failure report"
                );
            }
        }
    }

    fn status(&self) -> DomainLoopStatus {
        DomainLoopStatus {
            tick: self.pacer.current_tick(),
            paused: self.pacer.is_paused(),
            tasks: self.engine.tasks().task_count(&self.domain),
            pacer: self.pacer.metrics().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A handle whose loop has already gone away.
    fn orphaned_handle() -> DomainLoopHandle<&'static str> {
        let (commands, _) = mpsc::channel(1);
        let (_, reports) = mpsc::channel(1);
        let (_, ticks) = watch::channel(7);
        DomainLoopHandle {
            domain: "arena",
            commands,
            clock: DomainClock {
                domain: "arena",
                ticks,
            },
            reports,
            task: tokio::spawn(async {}),
        }
    }

    #[tokio::test]
    async fn test_commands_to_stopped_loop_are_unavailable() {
        let handle = orphaned_handle();

        assert!(matches!(handle.pause().await, Err(DriverError::Unavailable(_))));
        assert!(matches!(handle.status().await, Err(DriverError::Unavailable(_))));
        match handle.shutdown().await {
            Err(DriverError::Unavailable(domain)) => assert_eq!(domain, "\"arena\""),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_domain_clock_of_stopped_loop_reports_no_domain() {
        let handle = orphaned_handle();
        let clock = handle.clock();

        assert_eq!(clock.current(), 7);
        assert_eq!(clock.now(&"arena"), None);
    }

    #[test]
    fn test_domain_clock_only_answers_for_its_domain() {
        let (_tx, ticks) = watch::channel(12);
        let clock = DomainClock {
            domain: "arena",
            ticks,
        };

        assert_eq!(clock.now(&"arena"), Some(12));
        assert_eq!(clock.now(&"lobby"), None);
    }
}

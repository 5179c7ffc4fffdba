//! The tick pacer.

use std::time::{Duration, Instant};

use rand::Rng;
use tickwork_clock::Tick;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

use crate::{OverrunPolicy, PacerConfig};

/// One fired tick, returned by [`TickPacer::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedTick {
    /// Logical tick number. The first tick is 1, each fired tick adds 1.
    pub tick: Tick,
    /// The pacer woke up more than a tenth of a tick late.
    pub overrun: bool,
    /// Whole intervals that passed without a tick (Skip policy only).
    pub ticks_skipped: u64,
}

/// Running totals for one pacer.
///
/// Execution times are whatever the embedder reported through
/// [`TickPacer::record_tick_end`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacerMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average (α = 0.1) of per-tick work time.
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Work time of the last recorded tick over the tick budget. Above 1.0
    /// means the work did not fit.
    pub budget_utilization: f64,
}

/// Turns wall-clock time into a stream of logical ticks for one domain.
///
/// Meant to sit in a `tokio::select!` loop next to a command channel:
///
/// ```ignore
/// loop {
///     tokio::select! {
///         Some(cmd) = commands.recv() => { /* pause, resume, shutdown */ }
///         paced = pacer.wait_for_tick() => {
///             engine.step(&domain, &ctx, paced.tick);
///             pacer.record_tick_end();
///         }
///     }
/// }
/// ```
pub struct TickPacer {
    config: PacerConfig,
    tick_duration: Duration,
    tick: Tick,
    next_deadline: TokioInstant,
    /// Set when a tick fires, taken by `record_tick_end`.
    work_started: Option<Instant>,
    paused: bool,
    metrics: PacerMetrics,
}

impl TickPacer {
    /// Creates a pacer. The config is validated first; the first tick is due
    /// one interval from now plus the configured jitter.
    pub fn new(config: PacerConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = tick_duration.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick pacer created"
        );

        Self {
            tick_duration,
            tick: 0,
            next_deadline: TokioInstant::now() + tick_duration + jitter,
            work_started: None,
            paused: false,
            metrics: PacerMetrics::default(),
            config,
        }
    }

    /// Pacer at `tick_rate_hz` with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(PacerConfig::with_rate(tick_rate_hz))
    }

    /// Waits for the next tick.
    ///
    /// While paused this never resolves, which lets other `select!`
    /// branches (such as a resume command) keep running. Cancel-safe: if
    /// the future is dropped before the deadline, no tick is consumed.
    pub async fn wait_for_tick(&mut self) -> PacedTick {
        if self.paused {
            return std::future::pending().await;
        }

        let deadline = self.next_deadline;
        time::sleep_until(deadline).await;

        let woke = TokioInstant::now();
        self.tick += 1;
        self.work_started = Some(Instant::now());

        let late_by = woke.saturating_duration_since(deadline);
        let overrun = late_by > self.tick_duration / 10;
        let mut ticks_skipped = 0u64;

        self.next_deadline = match self.config.policy {
            OverrunPolicy::Skip => {
                if overrun {
                    ticks_skipped = whole_intervals(late_by, self.tick_duration);
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                woke + self.tick_duration
            }
            OverrunPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping original cadence"
                    );
                }
                deadline + self.tick_duration
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick, overrun, "tick fired");

        PacedTick {
            tick: self.tick,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the work done for the current tick.
    ///
    /// Feeds budget utilisation and timing metrics. Does nothing if no tick
    /// has fired since the last call.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= 1.0 {
            warn!(
                tick = self.tick,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.tick_duration.as_secs_f64() * 1000.0,
                "tick work exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick work approaching budget"
            );
        }

        self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);
        let alpha = 0.1;
        let avg = self.metrics.avg_tick_time.as_secs_f64();
        self.metrics.avg_tick_time =
            Duration::from_secs_f64(avg * (1.0 - alpha) + elapsed.as_secs_f64() * alpha);
    }

    /// Stops ticks until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick, "tick pacer paused");
        }
    }

    /// Resumes after a pause. The next tick is one interval from now; time
    /// spent paused is never replayed.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_deadline = TokioInstant::now() + self.tick_duration;
            debug!(tick = self.tick, "tick pacer resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The last tick fired, 0 before the first.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PacerMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for TickPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickPacer")
            .field("rate_hz", &self.config.tick_rate_hz)
            .field("tick", &self.tick)
            .field("paused", &self.paused)
            .finish()
    }
}

fn whole_intervals(late_by: Duration, interval: Duration) -> u64 {
    let interval = interval.as_nanos().max(1);
    u64::try_from(late_by.as_nanos() / interval).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_intervals_rounds_down() {
        let interval = Duration::from_millis(50);
        assert_eq!(whole_intervals(Duration::from_millis(49), interval), 0);
        assert_eq!(whole_intervals(Duration::from_millis(50), interval), 1);
        assert_eq!(whole_intervals(Duration::from_millis(175), interval), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_tick_end_without_tick_is_noop() {
        let mut pacer = TickPacer::with_rate(20);
        pacer.record_tick_end();
        assert_eq!(pacer.metrics(), &PacerMetrics::default());
    }
}

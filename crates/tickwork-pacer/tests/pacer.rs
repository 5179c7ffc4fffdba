//! Integration tests for the tick pacer.
//!
//! Runs on a paused tokio clock: sleeps resolve as soon as the runtime is
//! idle, and `time::advance` stands in for a stalled domain.

use std::time::Duration;

use tickwork_pacer::{OverrunPolicy, PacerConfig, TickPacer};
use tokio::time::{self, Instant};

// =========================================================================
// Helpers
// =========================================================================

fn pacer_20hz(policy: OverrunPolicy) -> TickPacer {
    TickPacer::new(PacerConfig {
        initial_jitter_us: 0,
        policy,
        ..PacerConfig::with_rate(20)
    })
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_numbers_from_one() {
    let mut pacer = pacer_20hz(OverrunPolicy::Skip);
    assert_eq!(pacer.current_tick(), 0);

    for expected in 1..=5 {
        let paced = pacer.wait_for_tick().await;
        assert_eq!(paced.tick, expected);
        assert!(!paced.overrun);
        assert_eq!(paced.ticks_skipped, 0);
    }
    assert_eq!(pacer.current_tick(), 5);
    assert_eq!(pacer.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_keeps_cadence() {
    let mut pacer = pacer_20hz(OverrunPolicy::Skip);
    let start = Instant::now();

    for _ in 0..4 {
        pacer.wait_for_tick().await;
    }

    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_jitter_is_bounded() {
    let mut pacer = TickPacer::new(PacerConfig {
        initial_jitter_us: 2_000,
        ..PacerConfig::with_rate(20)
    });
    let start = Instant::now();

    pacer.wait_for_tick().await;

    // Up to 2 ms of jitter, plus the timer rounding deadlines up to whole
    // milliseconds.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed <= Duration::from_millis(52), "elapsed {elapsed:?}");
}

// =========================================================================
// Overrun policies
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_reports_skipped_and_reanchors() {
    let mut pacer = pacer_20hz(OverrunPolicy::Skip);

    // Deadline is at +50ms; stall until +200ms.
    time::advance(Duration::from_millis(200)).await;
    let late = pacer.wait_for_tick().await;

    assert!(late.overrun);
    assert_eq!(late.ticks_skipped, 3);
    assert_eq!(late.tick, 1, "skipped intervals do not advance the tick");

    let before = Instant::now();
    let next = pacer.wait_for_tick().await;
    assert!(!next.overrun);
    assert_eq!(next.tick, 2);
    assert_eq!(before.elapsed(), Duration::from_millis(50));

    assert_eq!(pacer.metrics().total_overruns, 1);
    assert_eq!(pacer.metrics().total_skipped, 3);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_original_schedule() {
    let mut pacer = pacer_20hz(OverrunPolicy::Drop);

    time::advance(Duration::from_millis(200)).await;
    let stalled_at = Instant::now();

    // Deadlines at +50, +100, +150 and +200 have all passed: four ticks
    // fire without any time going by, the last one on schedule.
    let mut overruns = Vec::new();
    for _ in 0..4 {
        let paced = pacer.wait_for_tick().await;
        assert_eq!(paced.ticks_skipped, 0);
        overruns.push(paced.overrun);
    }

    assert_eq!(overruns, vec![true, true, true, false]);
    assert_eq!(Instant::now(), stalled_at);
    assert_eq!(pacer.current_tick(), 4);
}

// =========================================================================
// Pause / resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_stops_ticks() {
    let mut pacer = pacer_20hz(OverrunPolicy::Skip);
    pacer.wait_for_tick().await;

    pacer.pause();
    pacer.pause();
    assert!(pacer.is_paused());

    let result = time::timeout(Duration::from_secs(5), pacer.wait_for_tick()).await;
    assert!(result.is_err(), "paused pacer should never tick");
    assert_eq!(pacer.current_tick(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_does_not_burst() {
    let mut pacer = pacer_20hz(OverrunPolicy::Drop);
    pacer.wait_for_tick().await;

    pacer.pause();
    time::advance(Duration::from_secs(3)).await;
    pacer.resume();
    assert!(!pacer.is_paused());

    let resumed_at = Instant::now();
    let paced = pacer.wait_for_tick().await;

    assert_eq!(paced.tick, 2);
    assert!(!paced.overrun);
    assert_eq!(resumed_at.elapsed(), Duration::from_millis(50));
}

// =========================================================================
// Budget and metrics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_work_time() {
    let mut pacer = pacer_20hz(OverrunPolicy::Skip);

    pacer.wait_for_tick().await;
    // Work time is measured on the wall clock, not tokio's.
    std::thread::sleep(Duration::from_micros(200));
    pacer.record_tick_end();

    let metrics = pacer.metrics();
    assert!(metrics.max_tick_time >= Duration::from_micros(200));
    assert!(metrics.avg_tick_time > Duration::ZERO);
    assert!(metrics.budget_utilization > 0.0);
    assert!(metrics.budget_utilization < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_select_loop_with_command_channel() {
    let mut pacer = pacer_20hz(OverrunPolicy::Skip);
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        time::sleep(Duration::from_millis(160)).await;
        tx.send("stop").await.ok();
    });

    let mut fired = 0;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            paced = pacer.wait_for_tick() => {
                fired += 1;
                assert_eq!(paced.tick, fired);
                pacer.record_tick_end();
            }
        }
    }

    assert_eq!(fired, 3);
}

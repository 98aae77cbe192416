//! Tick sources for the engine loop.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of the engine's ticks.
#[async_trait]
pub trait Clock: Send {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Wait for the next tick and return its instant. `None` ends the loop.
    async fn next_tick(&mut self) -> Option<DateTime<Utc>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// WallClock
// ─────────────────────────────────────────────────────────────────────────────

/// System clock ticking on minute boundaries.
///
/// The first tick lands on the next full minute, later ticks every `period`.
/// Ticks missed while a slow tick runs are skipped, not replayed.
pub struct WallClock {
    interval: Interval,
}

impl WallClock {
    /// Clock ticking every `period` (at least one second).
    pub fn new(period: Duration) -> Self {
        let now = Utc::now();
        let into_minute = Duration::from_secs(u64::from(now.second()))
            + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
        let delay = Duration::from_secs(60).saturating_sub(into_minute);
        let mut interval = tokio::time::interval_at(Instant::now() + delay, period.max(Duration::from_secs(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Clock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn next_tick(&mut self) -> Option<DateTime<Utc>> {
        let _ = self.interval.tick().await;
        Some(Utc::now())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ManualClock
// ─────────────────────────────────────────────────────────────────────────────

/// Clock driven by hand. Each instant sent through the handle is one tick;
/// dropping the handle ends the loop.
pub struct ManualClock {
    current: DateTime<Utc>,
    ticks: mpsc::UnboundedReceiver<DateTime<Utc>>,
}

/// Feeds ticks into a [`ManualClock`].
#[derive(Clone)]
pub struct ManualClockHandle {
    tx: mpsc::UnboundedSender<DateTime<Utc>>,
}

impl ManualClock {
    /// A clock reading `start` until the first tick arrives.
    pub fn new(start: DateTime<Utc>) -> (Self, ManualClockHandle) {
        let (tx, ticks) = mpsc::unbounded_channel();
        (Self { current: start, ticks }, ManualClockHandle { tx })
    }
}

impl ManualClockHandle {
    /// Queue a tick at `at`. Returns `false` once the clock is gone.
    pub fn tick_at(&self, at: DateTime<Utc>) -> bool {
        self.tx.send(at).is_ok()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current
    }

    async fn next_tick(&mut self) -> Option<DateTime<Utc>> {
        let at = self.ticks.recv().await?;
        self.current = at;
        Some(at)
    }
}

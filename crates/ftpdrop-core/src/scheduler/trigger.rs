//! Periodic trigger abstraction.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Source of run triggers. `next_tick` must be cancel-safe: the scheduler
/// drops a pending call when shutdown wins the race.
pub trait Trigger: Send {
    /// Wait for the next tick. `false` means no more ticks will come.
    fn next_tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fixed-period ticks. Ticks missed while the loop was busy are skipped, not bunched.
pub struct IntervalTrigger {
    interval: tokio::time::Interval,
}

impl IntervalTrigger {
    /// Must be called inside a tokio runtime. With `immediate`, the first tick fires at once.
    pub fn new(period: Duration, immediate: bool) -> Self {
        let start = if immediate {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

impl Trigger for IntervalTrigger {
    async fn next_tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Fires once per message; exhausted when every sender is dropped.
pub struct ChannelTrigger {
    rx: mpsc::Receiver<()>,
}

impl ChannelTrigger {
    pub fn new(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

impl Trigger for ChannelTrigger {
    async fn next_tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

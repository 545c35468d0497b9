//! Run scheduler.
//!
//! Fires the pipeline on every trigger tick, one run at a time: a run must
//! hold the single worker slot, and a tick that finds the slot taken is
//! skipped. Runs execute on tokio's blocking pool so the tick loop stays
//! responsive. On shutdown the in-flight run is asked to stop after its
//! current entry and is awaited before `run` returns.

mod trigger;

pub use trigger::{ChannelTrigger, IntervalTrigger, Trigger};

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::control::ShutdownSignal;
use crate::pipeline::{Pipeline, RunReport};

/// Counters for one scheduler lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub ticks: u64,
    pub started: u64,
    /// Ticks that found a run still in flight.
    pub skipped: u64,
    pub completed: u64,
    /// Completed runs with a run-level failure or interruption, plus panicked runs.
    pub failed: u64,
}

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    slot: Arc<Mutex<()>>,
    shutdown: ShutdownSignal,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            slot: Arc::new(Mutex::new(())),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Token handed to every run; set once the `stop` future of `run` resolves.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Drive runs until the trigger is exhausted or `stop` resolves.
    pub async fn run<T, S>(&self, mut trigger: T, stop: S) -> SchedulerSummary
    where
        T: Trigger,
        S: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut summary = SchedulerSummary::default();
        let mut in_flight: Option<JoinHandle<RunReport>> = None;

        tracing::info!(host = %self.pipeline.job().host, "scheduler started");
        loop {
            tokio::select! {
                biased;
                () = &mut stop => {
                    tracing::info!("shutdown requested; letting the current run finish its entry");
                    self.shutdown.request();
                    break;
                }
                fired = trigger.next_tick() => {
                    if !fired {
                        tracing::debug!("trigger exhausted");
                        break;
                    }
                    summary.ticks += 1;
                    self.fire(&mut in_flight, &mut summary).await;
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            reap(handle, &mut summary).await;
        }
        tracing::info!(
            ticks = summary.ticks,
            started = summary.started,
            skipped = summary.skipped,
            failed = summary.failed,
            "scheduler stopped"
        );
        summary
    }

    async fn fire(&self, in_flight: &mut Option<JoinHandle<RunReport>>, summary: &mut SchedulerSummary) {
        let guard = match Arc::clone(&self.slot).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                summary.skipped += 1;
                tracing::warn!("previous run still in progress; skipping this tick");
                return;
            }
        };
        // Slot is free, so the previous run has returned; collect its result.
        if let Some(prev) = in_flight.take() {
            reap(prev, summary).await;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let shutdown = self.shutdown.clone();
        summary.started += 1;
        *in_flight = Some(tokio::task::spawn_blocking(move || {
            let _slot = guard;
            pipeline.run(&shutdown)
        }));
    }
}

async fn reap(handle: JoinHandle<RunReport>, summary: &mut SchedulerSummary) {
    match handle.await {
        Ok(report) => {
            summary.completed += 1;
            if !report.is_success() {
                summary.failed += 1;
            }
            tracing::info!(
                downloaded = report.downloaded().len(),
                entries = report.entries.len(),
                relocated = report.relocated,
                interrupted = report.interrupted,
                phase = %report.final_phase(),
                "run complete"
            );
        }
        Err(e) => {
            summary.failed += 1;
            tracing::error!("run task failed: {}", e);
        }
    }
}

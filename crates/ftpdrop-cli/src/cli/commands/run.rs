//! `ftpdrop run` – poll on a fixed period until a shutdown signal.

use std::sync::Arc;

use anyhow::Result;
use ftpdrop_core::config::FtpdropConfig;
use ftpdrop_core::scheduler::{IntervalTrigger, Scheduler};

use super::{build_pipeline, shutdown_signal};

pub async fn run_scheduler(cfg: &FtpdropConfig) -> Result<()> {
    let pipeline = build_pipeline(cfg)?;
    let job = pipeline.job();
    tracing::info!(
        host = %job.host,
        remote_dir = %job.remote_dir,
        period_secs = cfg.poll_period_secs,
        "polling"
    );

    let scheduler = Scheduler::new(Arc::new(pipeline));
    let trigger = IntervalTrigger::new(cfg.poll_period(), cfg.run_on_start);
    let summary = scheduler.run(trigger, shutdown_signal()).await;

    println!(
        "Stopped after {} run(s): {} failed, {} tick(s) skipped while busy.",
        summary.started, summary.failed, summary.skipped
    );
    Ok(())
}

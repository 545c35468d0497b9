//! `ftpdrop once` – a single pipeline run.

use std::sync::Arc;

use anyhow::{Context, Result};
use ftpdrop_core::config::FtpdropConfig;
use ftpdrop_core::control::ShutdownSignal;
use ftpdrop_core::pipeline::{EntryStatus, RunReport};

use super::{build_pipeline, shutdown_signal};

pub async fn run_once(cfg: &FtpdropConfig) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(cfg)?);
    let shutdown = ShutdownSignal::new();

    let watcher = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.request();
        })
    };
    let report = {
        let pipeline = Arc::clone(&pipeline);
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || pipeline.run(&shutdown))
            .await
            .context("run task failed")?
    };
    watcher.abort();

    print_report(&report);
    if let Some(failure) = &report.failure {
        anyhow::bail!("run failed while {}: {}", failure.phase, failure.error);
    }
    if report.interrupted {
        anyhow::bail!("run interrupted; staged files left in place");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for entry in &report.entries {
        let status = match &entry.status {
            EntryStatus::Downloaded { bytes } => format!("downloaded ({} bytes)", bytes),
            EntryStatus::Skipped { size } => format!("skipped ({} bytes)", size),
            EntryStatus::SizeUnknown => "size unknown".to_string(),
            EntryStatus::FetchFailed => "fetch failed".to_string(),
            EntryStatus::Rejected => "rejected name".to_string(),
        };
        println!("{:<40} {}", entry.name, status);
    }
    println!(
        "{} downloaded, {} entries, relocated: {}",
        report.downloaded().len(),
        report.entries.len(),
        if report.relocated { "yes" } else { "no" }
    );
}

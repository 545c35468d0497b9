//! `ftpdrop probe` – list the remote directory with sizes.

use anyhow::{Context, Result};
use ftpdrop_core::config::FtpdropConfig;

use super::build_pipeline;

pub async fn run_probe(cfg: &FtpdropConfig) -> Result<()> {
    let pipeline = build_pipeline(cfg)?;
    let threshold = pipeline.job().size_threshold;
    let entries = tokio::task::spawn_blocking(move || pipeline.probe())
        .await
        .context("probe task failed")??;

    if entries.is_empty() {
        println!("Remote directory is empty.");
        return Ok(());
    }
    println!("{:<12} {:<8} {}", "SIZE", "FETCH", "NAME");
    for e in entries {
        let size = match &e.size {
            Ok(s) => s.to_string(),
            Err(_) => "-".to_string(),
        };
        println!(
            "{:<12} {:<8} {}",
            size,
            if e.qualifies { "yes" } else { "no" },
            e.name
        );
    }
    println!("threshold: {} bytes", threshold);
    Ok(())
}

//! CLI command handlers, one per file.

mod config;
mod once;
mod probe;
mod run;

pub use config::run_config;
pub use once::run_once;
pub use probe::run_probe;
pub use run::run_scheduler;

use std::sync::Arc;

use anyhow::Result;
use ftpdrop_core::config::FtpdropConfig;
use ftpdrop_core::events::TracingSink;
use ftpdrop_core::pipeline::Pipeline;
use ftpdrop_core::retry::RetryPolicy;
use ftpdrop_core::source::{FtpOptions, FtpSource};

/// Pipeline wired to the FTP source and the tracing sink.
fn build_pipeline(cfg: &FtpdropConfig) -> Result<Pipeline> {
    let job = cfg.job()?;
    let source = Arc::new(FtpSource::new(FtpOptions::from(cfg)));
    let retry = RetryPolicy::from(&cfg.retry_config());
    Ok(Pipeline::new(job, source, Arc::new(TracingSink)).with_retry(retry))
}

/// Resolves on SIGTERM or SIGINT (Ctrl-C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("received SIGINT"),
                }
            }
            _ => {
                tracing::warn!("could not install unix signal handlers; falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received Ctrl-C");
    }
}

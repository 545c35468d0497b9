//! CLI for the ftpdrop scheduled FTP relay.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ftpdrop_core::config::{self, FtpdropConfig};

use commands::{run_config, run_once, run_probe, run_scheduler};

/// Top-level CLI for ftpdrop.
#[derive(Debug, Parser)]
#[command(name = "ftpdrop")]
#[command(about = "ftpdrop: pull small files from an FTP directory on a schedule", long_about = None)]
pub struct Cli {
    /// Config file to use instead of the XDG default (created with defaults if missing).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Poll the remote directory on a fixed period until SIGINT/SIGTERM.
    Run {
        /// Override `poll_period_secs` from the config file.
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        period: Option<u64>,
    },

    /// Run the pipeline once and exit (non-zero if the run failed).
    Once,

    /// List the remote directory with sizes; downloads nothing.
    Probe,

    /// Print the config file path and the effective configuration.
    Config,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config::config_path(),
        }
    }

    pub fn load_config(&self) -> Result<FtpdropConfig> {
        config::load_or_init_at(&self.config_path()?)
    }

    pub async fn dispatch(self, mut cfg: FtpdropConfig) -> Result<()> {
        tracing::debug!("loaded config: {:?}", cfg);
        let config_path = self.config_path()?;
        match self.command {
            CliCommand::Run { period } => {
                if let Some(secs) = period {
                    cfg.poll_period_secs = secs;
                }
                run_scheduler(&cfg).await?
            }
            CliCommand::Once => run_once(&cfg).await?,
            CliCommand::Probe => run_probe(&cfg).await?,
            CliCommand::Config => run_config(&config_path, &cfg)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;

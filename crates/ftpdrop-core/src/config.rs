use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::{Credentials, TransferJob};

/// Environment variable that overrides `secret` from the config file.
pub const SECRET_ENV: &str = "FTPDROP_SECRET";

/// Default upper bound for a file to be downloaded (10 MiB).
pub const DEFAULT_SIZE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Default poll period in seconds.
pub const DEFAULT_POLL_PERIOD_SECS: u64 = 20;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of fetch attempts per entry (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/ftpdrop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct FtpdropConfig {
    /// Remote FTP host, optionally with `:port`.
    pub host: String,
    /// Login user.
    pub user: String,
    /// Login password; `FTPDROP_SECRET` takes precedence when set.
    #[serde(default)]
    pub secret: Option<String>,
    /// Remote directory to poll.
    pub remote_dir: String,
    /// Local holding directory for downloads before relocation.
    pub staging_dir: PathBuf,
    /// Final location the staging directory is moved onto.
    pub destination_dir: PathBuf,
    /// Entries larger than this many bytes are skipped.
    #[serde(default = "default_size_threshold")]
    pub size_threshold_bytes: u64,
    /// Seconds between run triggers.
    #[serde(default = "default_poll_period")]
    pub poll_period_secs: u64,
    /// Fire the first run immediately instead of after one period.
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
    /// Connect timeout for the FTP control connection (None = 30s).
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Log file location (None = XDG state dir).
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_size_threshold() -> u64 {
    DEFAULT_SIZE_THRESHOLD
}

fn default_poll_period() -> u64 {
    DEFAULT_POLL_PERIOD_SECS
}

fn default_run_on_start() -> bool {
    true
}

impl Default for FtpdropConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: "anonymous".to_string(),
            secret: None,
            remote_dir: "/".to_string(),
            staging_dir: PathBuf::from("ftpdrop-staging"),
            destination_dir: PathBuf::from("ftpdrop-inbox"),
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD,
            poll_period_secs: DEFAULT_POLL_PERIOD_SECS,
            run_on_start: true,
            connect_timeout_secs: None,
            log_file: None,
            retry: None,
        }
    }
}

impl std::fmt::Debug for FtpdropConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpdropConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("remote_dir", &self.remote_dir)
            .field("staging_dir", &self.staging_dir)
            .field("destination_dir", &self.destination_dir)
            .field("size_threshold_bytes", &self.size_threshold_bytes)
            .field("poll_period_secs", &self.poll_period_secs)
            .field("run_on_start", &self.run_on_start)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("log_file", &self.log_file)
            .field("retry", &self.retry)
            .finish()
    }
}

impl FtpdropConfig {
    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("`host` is not set; edit the config file or pass --config");
        }
        if self.poll_period_secs == 0 {
            anyhow::bail!("`poll_period_secs` must be at least 1");
        }
        if self.staging_dir.as_os_str().is_empty() || self.destination_dir.as_os_str().is_empty() {
            anyhow::bail!("`staging_dir` and `destination_dir` must be set");
        }
        if self.staging_dir == self.destination_dir {
            anyhow::bail!("`staging_dir` and `destination_dir` must differ");
        }
        if self.destination_dir.starts_with(&self.staging_dir)
            || self.staging_dir.starts_with(&self.destination_dir)
        {
            anyhow::bail!("`staging_dir` and `destination_dir` must not be nested in each other");
        }
        Ok(())
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Build the job for one run. `env_secret` is the value of `FTPDROP_SECRET`, if any.
    pub fn job_with_secret(&self, env_secret: Option<String>) -> Result<TransferJob> {
        self.validate()?;
        let secret = env_secret
            .or_else(|| self.secret.clone())
            .unwrap_or_default();
        Ok(TransferJob {
            host: self.host.trim().to_string(),
            credentials: Credentials::new(self.user.clone(), secret),
            remote_dir: self.remote_dir.clone(),
            staging_dir: self.staging_dir.clone(),
            destination_dir: self.destination_dir.clone(),
            size_threshold: self.size_threshold_bytes,
        })
    }

    /// Build the job for one run, reading the secret override from the environment.
    pub fn job(&self) -> Result<TransferJob> {
        self.job_with_secret(std::env::var(SECRET_ENV).ok())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ftpdrop")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FtpdropConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` but for an explicit path (e.g. `--config`).
pub fn load_or_init_at(path: &Path) -> Result<FtpdropConfig> {
    if !path.exists() {
        let default_cfg = FtpdropConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("failed to write default config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let cfg: FtpdropConfig =
        toml::from_str(&data).with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}

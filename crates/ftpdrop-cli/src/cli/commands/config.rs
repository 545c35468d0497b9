//! `ftpdrop config` – show where the config lives and what it resolves to.

use std::path::Path;

use anyhow::Result;
use ftpdrop_core::config::{FtpdropConfig, SECRET_ENV};

pub fn run_config(path: &Path, cfg: &FtpdropConfig) -> Result<()> {
    println!("config: {}", path.display());
    println!("{:#?}", cfg);
    if std::env::var_os(SECRET_ENV).is_some() {
        println!("secret overridden by ${}", SECRET_ENV);
    }
    if let Err(e) = cfg.validate() {
        println!("warning: {:#}", e);
    }
    Ok(())
}

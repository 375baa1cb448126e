//! `resilient config` – print the config path and effective settings.

use anyhow::Result;
use resilient_core::config::{self, ResilientConfig};

pub fn run_config(cfg: &ResilientConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    let effective = ResilientConfig {
        retry: Some(cfg.retry()),
        http: Some(cfg.http()),
    };
    print!("{}", effective.to_toml()?);
    Ok(())
}

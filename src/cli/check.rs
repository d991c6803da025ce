// src/cli/check.rs
// Configuration report

use anyhow::{Result, bail};
use wafaq::config::EnvConfig;

pub fn run_check(config: &EnvConfig) -> Result<()> {
    let validation = config.validate();

    println!("{}", config.summary());
    println!("{}", validation.report());

    if !validation.is_valid() {
        bail!("configuration has {} error(s)", validation.errors.len());
    }
    Ok(())
}

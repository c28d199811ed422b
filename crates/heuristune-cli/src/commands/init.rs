//! `heuristune init`

use crate::console::CliConsole;
use anyhow::{Context, bail};
use heuristune_core::{Direction, TunerConfig};
use std::path::Path;

/// Write a config file for `objective` and a time limit in seconds
pub fn run(config_path: &Path, objective: &str, time_limit_secs: f64, force: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(true);

    if config_path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            config_path.display()
        );
    }

    let direction: Direction = objective.parse()?;
    if !(time_limit_secs > 0.0) {
        bail!("time limit must be positive, got {}", time_limit_secs);
    }
    let time_limit_ms = (time_limit_secs * 1000.0).round() as u64;

    let work_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let config = TunerConfig::new(direction, time_limit_ms).with_work_dir(work_dir);
    config.validate()?;

    for dir in [config.input_dir(), config.output_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    config
        .save(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    console.success(&format!("Wrote {}", config_path.display()));
    console.field("objective", direction);
    console.field("time limit", format!("{} ms", time_limit_ms));
    Ok(())
}

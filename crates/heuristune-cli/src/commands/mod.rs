//! Command implementations

pub mod build;
pub mod generate;
pub mod init;
pub mod params;
pub mod test;
pub mod tune;

use anyhow::Context;
use heuristune_core::TunerConfig;
use std::path::Path;

/// Load and validate the config file
pub fn load_config(path: &Path) -> anyhow::Result<TunerConfig> {
    TunerConfig::load(path).with_context(|| format!("Cannot use config {}", path.display()))
}

//! `heuristune build`

use super::load_config;
use crate::console::CliConsole;
use heuristune_core::runner::Builder;
use std::path::Path;

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let config = load_config(config_path)?;
    let solution = config.solution_path();

    Builder::new(config.build.command.clone(), config.work_dir())
        .build(&solution)
        .await?;

    console.success(&format!("Built {}", solution.display()));
    Ok(())
}

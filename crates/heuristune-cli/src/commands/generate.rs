//! `heuristune gen`

use super::load_config;
use crate::console::CliConsole;
use heuristune_core::runner::CaseGenerator;
use std::path::Path;

/// Generate inputs for seeds `start..end`
pub async fn run(config_path: &Path, start: u32, end: u32) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let config = load_config(config_path)?;

    let generator = CaseGenerator::new(
        config.generator_path(),
        config.input_dir(),
        config.work_dir(),
    );
    let written = generator.generate(start..end).await?;

    console.success(&format!(
        "Generated {} inputs in {}",
        written.len(),
        config.input_dir().display()
    ));
    Ok(())
}

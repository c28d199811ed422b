//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use crate::commands::tune::TuneOptions;
use heuristune_core::study::StudySelection;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Init {
            objective,
            time_limit,
            force,
        } => commands::init::run(&config_path, &objective, time_limit, force),
        Commands::Build => commands::build::run(&config_path).await,
        Commands::Test {
            no_params,
            count,
            format,
        } => commands::test::run(&config_path, !no_params, count, format.into(), verbose).await,
        Commands::Tune {
            dir,
            last,
            zero,
            trials,
            jobs,
            seed,
            env_prefix,
        } => {
            let selection = match (dir, last) {
                (Some(name), _) => StudySelection::Named(name),
                (None, true) => StudySelection::Last,
                (None, false) => StudySelection::Fresh,
            };
            let options = TuneOptions {
                selection,
                trials: if zero { Some(0) } else { trials },
                jobs,
                seed,
                env_prefix,
            };
            commands::tune::run(&config_path, options, verbose).await
        }
        Commands::Params { action } => commands::params::run(&config_path, action),
        Commands::Generate { start, end } => {
            commands::generate::run(&config_path, start, end).await
        }
        Commands::Studies => commands::tune::list(&config_path),
    }
}

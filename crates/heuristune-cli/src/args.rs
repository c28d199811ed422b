//! CLI argument definitions using clap
//!
//! - heuristune init max 2            # Write a config for a 2s maximize problem
//! - heuristune build                 # Compile the solution
//! - heuristune test                  # Run the pretest batch
//! - heuristune tune                  # Search parameters in a study
//! - heuristune params show           # Inspect the parameter schema
//! - heuristune gen 0 100             # Generate inputs 0..100

use clap::{Parser, Subcommand, ValueEnum};
use heuristune_core::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "heuristune")]
#[command(about = "Pretest runner and parameter tuner for heuristic contest solutions")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fresh configuration file
    #[command(verbatim_doc_comment)]
    Init {
        /// Optimization direction: max, maximize, min or minimize
        objective: String,

        /// Contest time limit in seconds
        time_limit: f64,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Compile the solution with the configured build command
    Build,

    /// Build, then run the pretest batch and summarize it
    Test {
        /// Run without injecting the current parameter values
        #[arg(long)]
        no_params: bool,

        /// Number of cases (defaults to problem.pretest_count)
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// Summary format
        #[arg(long, value_enum, default_value = "table")]
        format: FormatArg,
    },

    /// Search parameter values in a study
    Tune {
        /// Study directory name (created if missing)
        #[arg(long, conflicts_with = "last")]
        dir: Option<String>,

        /// Resume the most recent study
        #[arg(long)]
        last: bool,

        /// Run no trials; only report and finalize existing history
        #[arg(long, conflicts_with = "trials")]
        zero: bool,

        /// Number of trials (defaults to search.trials)
        #[arg(long, short = 't')]
        trials: Option<usize>,

        /// Concurrent evaluations
        #[arg(long, short = 'j', env = "HEURISTUNE_JOBS")]
        jobs: Option<usize>,

        /// Seed for the case order and sampler
        #[arg(long, env = "HEURISTUNE_SEED")]
        seed: Option<u64>,

        /// Prefix of the environment variables carrying parameters
        #[arg(long, env = "HEURISTUNE_ENV_PREFIX")]
        env_prefix: Option<String>,
    },

    /// Inspect or edit the parameter schema
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },

    /// Generate input files for seeds L..R with the generator
    #[command(name = "gen")]
    Generate {
        /// First seed (inclusive)
        start: u32,

        /// Last seed (exclusive)
        end: u32,
    },

    /// List study directories
    Studies,
}

#[derive(Subcommand, Clone)]
pub enum ParamsAction {
    /// Print the schema
    Show,

    /// Add a parameter, replacing one with the same name
    Add {
        name: String,

        #[arg(value_enum)]
        kind: KindArg,

        lower: String,

        upper: String,

        /// Default value
        value: String,

        /// Keep the value fixed during the search
        #[arg(long)]
        fixed: bool,

        /// Sample a float parameter on a log scale
        #[arg(long)]
        log: bool,
    },

    /// Remove a parameter
    Remove { name: String },

    /// Extract parameters from HP_PARAM macros in the source file
    Extract {
        /// Overwrite an existing schema
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Int,
    Float,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Table,
    Json,
    Markdown,
}

impl From<FormatArg> for heuristune_core::ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Table => Self::Table,
            FormatArg::Json => Self::Json,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tune_flags() {
        let cli = Cli::try_parse_from([
            "heuristune", "tune", "--dir", "study_a", "-t", "40", "-j", "3", "--seed", "9",
        ])
        .unwrap();
        match cli.command {
            Commands::Tune {
                dir,
                last,
                trials,
                jobs,
                seed,
                ..
            } => {
                assert_eq!(dir.as_deref(), Some("study_a"));
                assert!(!last);
                assert_eq!(trials, Some(40));
                assert_eq!(jobs, Some(3));
                assert_eq!(seed, Some(9));
            }
            _ => panic!("expected tune"),
        }
    }

    #[test]
    fn test_dir_conflicts_with_last() {
        assert!(Cli::try_parse_from(["heuristune", "tune", "--dir", "a", "--last"]).is_err());
        assert!(Cli::try_parse_from(["heuristune", "tune", "--zero", "--trials", "3"]).is_err());
    }

    #[test]
    fn test_gen_subcommand_name() {
        let cli = Cli::try_parse_from(["heuristune", "gen", "10", "20"]).unwrap();
        assert!(matches!(cli.command, Commands::Generate { start: 10, end: 20 }));
    }

    #[test]
    fn test_params_add_and_global_config() {
        let cli = Cli::try_parse_from([
            "heuristune", "params", "add", "temp", "float", "0.1", "10", "1.5", "--log",
            "--config", "x/heuristune.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("x/heuristune.toml"));
        match cli.command {
            Commands::Params {
                action:
                    ParamsAction::Add {
                        name, kind, log, fixed, ..
                    },
            } => {
                assert_eq!(name, "temp");
                assert!(matches!(kind, KindArg::Float));
                assert!(log);
                assert!(!fixed);
            }
            _ => panic!("expected params add"),
        }
    }
}

//! Heuristune CLI application
//!
//! Pretest runner and parameter tuner for heuristic contest solutions.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/heuristune-cli
//! ```
//!
//! # Workflow
//!
//! ```bash
//! heuristune init max 2          # write heuristune.toml (maximize, 2s limit)
//! heuristune gen 0 150           # generate in/0000.txt .. in/0149.txt
//! heuristune params extract      # scan main.cpp for HP_PARAM macros
//! heuristune test                # build and run the pretest batch
//! heuristune tune --trials 300   # search parameters in a fresh study
//! heuristune tune --last --zero  # re-finalize the latest study
//! ```
//!
//! Set `RUST_LOG=debug` (or pass `--verbose`) for engine logs.

#![allow(clippy::too_many_arguments)]

mod args;
mod commands;
mod console;
mod router;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = router::route(cli).await {
        console::CliConsole::new(false).error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

//! `heuristune tune` and `heuristune studies`

use super::load_config;
use crate::console::CliConsole;
use anyhow::Context;
use colored::*;
use heuristune_core::report::format_score;
use heuristune_core::search::TrialEvent;
use heuristune_core::{StudyManager, StudySelection, StudySummary, TrialState, Tuner};
use std::path::Path;
use std::sync::Arc;

/// Command-line overrides for a search run
#[derive(Debug, Clone, Default)]
pub struct TuneOptions {
    pub selection: StudySelection,
    pub trials: Option<usize>,
    pub jobs: Option<usize>,
    pub seed: Option<u64>,
    pub env_prefix: Option<String>,
}

/// Prepare the study, run the search and write back the best parameters
pub async fn run(config_path: &Path, options: TuneOptions, verbose: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    let config = load_config(config_path)?
        .with_seed(options.seed)
        .with_jobs(options.jobs)
        .with_env_prefix(options.env_prefix);

    let manager = StudyManager::new(&config);
    let artifact = manager
        .prepare_study(options.selection)
        .await
        .context("Failed to prepare study")?;
    console.success(&format!("Study {}", artifact.name));
    console.info(&format!("Study directory: {}", artifact.dir.display()));

    let trials = options.trials.unwrap_or(config.search.trials);
    let jobs = config.effective_jobs();

    let mut tuner = Tuner::new(&config, artifact.clone())?;
    let bar = console.trial_bar(trials);
    let progress = bar.clone();
    tuner.set_progress_callback(Arc::new(move |event: TrialEvent| {
        progress.inc(1);
        if let Some(best) = event.best_value {
            progress.set_message(format!("best {}", format_score(best)));
        }
        if event.state == TrialState::Pruned {
            tracing::debug!(trial = event.number, value = event.value, "Trial pruned");
        }
    }));

    // Ctrl-C stops new trials; running ones finish and are recorded
    let cancel = tuner.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = tuner.run(trials, jobs).await;
    interrupt.abort();
    bar.finish_and_clear();
    let summary = result?;
    if tuner.cancellation_token().is_cancelled() {
        console.warn("Interrupted, finalizing completed trials");
    }

    print_summary(&console, &summary)?;

    match &summary.best {
        Some(best) => {
            let value = best.value.unwrap_or_default();
            manager.finalize(&artifact, &best.params, value)?;
            console.success(&format!(
                "Wrote best parameters to {}",
                config.params_path().display()
            ));
        }
        None => console.warn("No completed trials, parameters unchanged"),
    }
    Ok(())
}

fn print_summary(console: &CliConsole, summary: &StudySummary) -> anyhow::Result<()> {
    console.print_header(&format!("Study {}", summary.study_name));
    console.field("complete", summary.complete);
    console.field("pruned", summary.pruned);
    console.field("failed", summary.failed);
    if summary.running > 0 {
        console.field("running", summary.running);
    }

    if let Some(best) = &summary.best {
        let value = best.value.map(format_score).unwrap_or_else(|| "-".to_string());
        console.field("best trial", best.number);
        console.field("best value", value.green().bold());
        println!("{}", serde_json::to_string_pretty(&best.params)?);
    }
    Ok(())
}

/// List the study directories under the study root
pub fn list(config_path: &Path) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let config = load_config(config_path)?;
    let manager = StudyManager::new(&config);

    let names = manager.list_studies()?;
    if names.is_empty() {
        console.warn(&format!(
            "No studies under {}",
            manager.study_root().display()
        ));
        return Ok(());
    }
    for name in &names {
        println!("{}", name);
    }
    println!("\nTotal: {} studies", names.len());
    Ok(())
}

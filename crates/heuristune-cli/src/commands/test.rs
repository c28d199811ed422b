//! `heuristune test`: the pretest batch

use super::load_config;
use crate::console::CliConsole;
use colored::*;
use heuristune_core::report::format_score;
use heuristune_core::runner::{Builder, CaseProgress};
use heuristune_core::{
    BatchReport, CaseExecutor, CaseResult, CaseSettings, ParameterSchema, PretestRunner,
    ReportFormat, TestSuite, generate_report,
};
use std::path::Path;

/// Build, run cases `0..count` and print the summary
pub async fn run(
    config_path: &Path,
    with_params: bool,
    count: Option<usize>,
    format: ReportFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    let config = load_config(config_path)?;
    let solution = config.solution_path();

    Builder::new(config.build.command.clone(), config.work_dir())
        .build(&solution)
        .await?;
    console.info(&format!("Built {}", solution.display()));

    let env = if with_params && config.params_path().is_file() {
        let schema = ParameterSchema::load(config.params_path())?;
        console.info(&format!("Injecting {} parameters", schema.len()));
        schema.defaults().to_env(&config.search.env_prefix)
    } else {
        Vec::new()
    };

    let count = count.unwrap_or(config.problem.pretest_count);
    let runner = PretestRunner::new(
        CaseExecutor::new(CaseSettings::from_config(&config, &solution)),
        TestSuite::new(config.input_dir(), count),
        config.output_dir(),
    )
    .with_env(env);

    // Structured formats keep stdout machine-readable
    let live = matches!(format, ReportFormat::Table);
    let results = runner
        .run(|progress| {
            if !live {
                return;
            }
            match progress {
                CaseProgress::Finished(result) => println!("{}", case_line(result)),
                CaseProgress::Skipped(id) => {
                    console.warn(&format!("{}  skipped (input missing)", id))
                }
            }
        })
        .await?;

    let report = BatchReport::new(config.problem.time_limit_ms, count, results);
    println!("{}", generate_report(&report, format)?);
    Ok(())
}

/// One line per finished case, e.g. `0003  score: 1,234 (12.34 ms)`
fn case_line(result: &CaseResult) -> String {
    let timing = format!("({:.2} ms)", result.elapsed_ms);
    if result.succeeded() {
        format!(
            "{}  score: {} {}",
            result.case_id,
            format_score(result.score),
            timing.dimmed()
        )
    } else {
        let reason = match result.raw_score {
            Some(raw) => format!("{} ({})", result.failure.label(), raw),
            None => result.failure.label().to_string(),
        };
        format!("{}  {} {}", result.case_id, reason.red().bold(), timing.dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heuristune_core::{CaseId, FailureKind};

    #[test]
    fn test_case_line() {
        colored::control::set_override(false);
        let ok = CaseResult {
            case_id: CaseId::new(3),
            score: 1234.0,
            raw_score: Some(1234),
            elapsed_ms: 12.34,
            failure: FailureKind::None,
        };
        assert_eq!(case_line(&ok), "0003  score: 1,234 (12.34 ms)");

        let invalid = CaseResult {
            case_id: CaseId::new(12),
            score: -1.0,
            raw_score: Some(0),
            elapsed_ms: 3.0,
            failure: FailureKind::NonPositiveScore,
        };
        assert_eq!(case_line(&invalid), "0012  invalid score (0) (3.00 ms)");

        let timeout = CaseResult {
            failure: FailureKind::Timeout,
            raw_score: None,
            ..invalid
        };
        assert_eq!(case_line(&timeout), "0012  timeout (3.00 ms)");
    }
}

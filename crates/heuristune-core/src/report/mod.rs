//! Report generation for pretest batches
//!
//! Renders a [`BatchReport`] as a terminal table, JSON or Markdown.

mod json;
mod markdown;

pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{BatchSummary, CaseResult};

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
    Markdown,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

/// Everything a pretest report shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub timestamp: DateTime<Utc>,
    pub time_limit_ms: u64,
    /// Cases the batch was asked to run
    pub requested_count: usize,
    /// Requested cases with no input file
    pub skipped_count: usize,
    pub summary: BatchSummary,
    pub cases: Vec<CaseResult>,
}

impl BatchReport {
    pub fn new(time_limit_ms: u64, requested_count: usize, cases: Vec<CaseResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            time_limit_ms,
            requested_count,
            skipped_count: requested_count.saturating_sub(cases.len()),
            summary: BatchSummary::from_cases(&cases),
            cases,
        }
    }
}

/// Generate a report in the specified format
pub fn generate_report(report: &BatchReport, format: ReportFormat) -> serde_json::Result<String> {
    match format {
        ReportFormat::Json => JsonReporter::generate(report),
        ReportFormat::Markdown => Ok(MarkdownReporter::generate(report)),
        ReportFormat::Table => Ok(generate_table(report)),
    }
}

/// Integer part with thousands separators, e.g. `1,234,567`
pub fn format_score(score: f64) -> String {
    let rounded = score.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn generate_table(report: &BatchReport) -> String {
    let s = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "{:=<60}", "= Pretest Summary ");
    let _ = writeln!(
        out,
        "Cases: {}/{} | Time limit: {} ms | {}",
        s.case_count,
        report.requested_count,
        report.time_limit_ms,
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{:-<60}", "");
    let _ = writeln!(
        out,
        "Wrong answers:  {} / {} (timeout {}, judge {}, invalid {})",
        s.failure_count,
        report.requested_count,
        s.timeout_count,
        s.judge_failure_count,
        s.non_positive_count
    );
    if report.skipped_count > 0 {
        let _ = writeln!(out, "Skipped:        {} (input missing)", report.skipped_count);
    }
    match s.max_elapsed_case {
        Some(case) => {
            let _ = writeln!(out, "Max time:       {:.2} ms (case {})", s.max_elapsed_ms, case);
        }
        None => {
            let _ = writeln!(out, "Max time:       -");
        }
    }
    let _ = writeln!(out, "Total score:    {}", format_score(s.total_score));
    let _ = writeln!(out, "Average score:  {}", format_score(s.mean_score));
    let _ = writeln!(out, "{:=<60}", "");
    out
}

//! Markdown report generation

use std::fmt::Write as _;

use super::{BatchReport, format_score};

/// Markdown report generator
pub struct MarkdownReporter;

impl MarkdownReporter {
    pub fn generate(report: &BatchReport) -> String {
        let s = &report.summary;
        let mut md = String::new();

        md.push_str("# Pretest Report\n\n");
        let _ = writeln!(
            md,
            "- **Timestamp**: {}",
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(md, "- **Time limit**: {} ms\n", report.time_limit_ms);

        md.push_str("## Summary\n\n");
        md.push_str("| Metric | Value |\n|--------|-------|\n");
        let _ = writeln!(md, "| Requested | {} |", report.requested_count);
        let _ = writeln!(md, "| Cases | {} |", s.case_count);
        let _ = writeln!(md, "| Skipped | {} |", report.skipped_count);
        let _ = writeln!(md, "| Succeeded | {} |", s.success_count);
        let _ = writeln!(md, "| Timeouts | {} |", s.timeout_count);
        let _ = writeln!(md, "| Judge failures | {} |", s.judge_failure_count);
        let _ = writeln!(md, "| Invalid scores | {} |", s.non_positive_count);
        if let Some(case) = s.max_elapsed_case {
            let _ = writeln!(md, "| Max time | {:.2} ms ({}) |", s.max_elapsed_ms, case);
        }
        let _ = writeln!(md, "| Total score | {} |", format_score(s.total_score));
        let _ = writeln!(md, "| Average score | {} |\n", format_score(s.mean_score));

        md.push_str("## Cases\n\n");
        md.push_str("| Case | Score | Time (ms) | Status |\n");
        md.push_str("|------|-------|-----------|--------|\n");
        for case in &report.cases {
            let score = match case.raw_score {
                Some(raw) => format_score(raw as f64),
                None => "-".to_string(),
            };
            let _ = writeln!(
                md,
                "| {} | {} | {:.2} | {} |",
                case.case_id,
                score,
                case.elapsed_ms,
                case.failure.label()
            );
        }

        md
    }
}

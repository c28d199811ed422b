//! JSON report generation

use super::BatchReport;

/// JSON report generator
pub struct JsonReporter;

impl JsonReporter {
    pub fn generate(report: &BatchReport) -> serde_json::Result<String> {
        serde_json::to_string_pretty(report)
    }

    /// Single-line variant for log pipelines
    pub fn generate_compact(report: &BatchReport) -> serde_json::Result<String> {
        serde_json::to_string(report)
    }
}

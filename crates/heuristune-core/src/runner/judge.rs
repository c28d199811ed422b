//! Score extraction from the judge's stdout

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use super::RunnerError;

/// Parse the score printed after `marker`
///
/// Lines are trimmed and scanned in order; the first line starting with
/// `marker` decides. Its text after the last `=` must parse as an integer.
pub fn parse_score(stdout: &str, marker: &str) -> Option<i64> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(marker))?;
    let (_, value) = line.rsplit_once('=')?;
    value.trim().parse().ok()
}

/// Invokes the judge as `judge <input> <output>`
pub struct JudgeRunner;

impl JudgeRunner {
    /// Run the judge and extract its score
    ///
    /// Returns `Ok(None)` when the judge exits non-zero or prints no usable
    /// score line. Failing to start the judge is an error.
    pub async fn extract_score(
        judge: &Path,
        input_path: &Path,
        output_path: &Path,
        marker: &str,
    ) -> Result<Option<i64>, RunnerError> {
        let output = Command::new(judge)
            .arg(input_path)
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                program: judge.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            tracing::debug!(
                judge = %judge.display(),
                input = %input_path.display(),
                status = ?output.status.code(),
                "Judge exited with failure"
            );
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let score = parse_score(&stdout, marker);
        if score.is_none() {
            tracing::debug!(input = %input_path.display(), marker, "No score line in judge output");
        }
        Ok(score)
    }
}

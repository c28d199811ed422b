//! Sequential pretest runs over a fixed range of cases

use std::path::PathBuf;

use super::RunnerError;
use super::case::{CaseExecutor, CaseId};
use super::suite::TestSuite;
use crate::metrics::CaseResult;

/// Progress notification for one case of a batch
#[derive(Debug, Clone, Copy)]
pub enum CaseProgress<'a> {
    Finished(&'a CaseResult),
    /// Input file was missing, the case was not run
    Skipped(CaseId),
}

/// Runs every case of a suite once, keeping outputs at `<output_dir>/<id>.txt`
pub struct PretestRunner {
    executor: CaseExecutor,
    suite: TestSuite,
    output_dir: PathBuf,
    env: Vec<(String, String)>,
}

impl PretestRunner {
    pub fn new(executor: CaseExecutor, suite: TestSuite, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            suite,
            output_dir: output_dir.into(),
            env: Vec::new(),
        }
    }

    /// Environment passed to every run
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Run all cases in order
    ///
    /// Missing inputs are skipped with a warning. Supervisor errors abort the
    /// batch.
    pub async fn run<F>(&self, mut on_progress: F) -> Result<Vec<CaseResult>, RunnerError>
    where
        F: FnMut(CaseProgress<'_>),
    {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| RunnerError::Io {
            path: self.output_dir.display().to_string(),
            source,
        })?;

        let mut results = Vec::with_capacity(self.suite.len());
        for case in self.suite.cases() {
            if !case.input_path.is_file() {
                tracing::warn!(case = %case.id, path = %case.input_path.display(), "Input file missing, skipping");
                on_progress(CaseProgress::Skipped(case.id));
                continue;
            }

            let output_path = self.output_dir.join(case.id.file_name());
            let result = self
                .executor
                .run_case(&case, &output_path, &self.env)
                .await?;
            on_progress(CaseProgress::Finished(&result));
            results.push(result);
        }

        tracing::info!(
            cases = results.len(),
            skipped = self.suite.len() - results.len(),
            "Pretest batch finished"
        );
        Ok(results)
    }
}

//! Evaluation of one candidate over the test suite

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use super::session::TrialReporter;
use crate::metrics::{EvaluationOutcome, RunningMean};
use crate::runner::{CaseExecutor, CaseId, RunnerError, TestSuite};
use crate::schema::CandidateParameterSet;
use crate::store::StoreError;

/// Errors that abort an evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Input for case {case} not found at {path}")]
    MissingInput { case: CaseId, path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Evaluates candidates case by case, reporting progress as it goes
#[derive(Debug, Clone)]
pub struct CandidateEvaluator {
    executor: CaseExecutor,
    suite: TestSuite,
    scratch_dir: PathBuf,
    env_prefix: String,
}

impl CandidateEvaluator {
    pub fn new(
        executor: CaseExecutor,
        suite: TestSuite,
        scratch_dir: impl Into<PathBuf>,
        env_prefix: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            suite,
            scratch_dir: scratch_dir.into(),
            env_prefix: env_prefix.into(),
        }
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Case order for an evaluation; reproducible when seeded
    pub fn case_order(&self, seed: Option<u64>) -> Vec<u32> {
        let mut order: Vec<u32> = (0..self.suite.len() as u32).collect();
        match seed {
            Some(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => order.shuffle(&mut rand::thread_rng()),
        }
        order
    }

    /// Run every case with `candidate`, stopping early when the reporter
    /// asks to prune
    ///
    /// The running mean includes failure scores. Per-case output files are
    /// removed once judged.
    pub async fn evaluate(
        &self,
        candidate: &CandidateParameterSet,
        seed: Option<u64>,
        reporter: &mut dyn TrialReporter,
    ) -> Result<EvaluationOutcome, EvalError> {
        std::fs::create_dir_all(&self.scratch_dir).map_err(|source| EvalError::Io {
            path: self.scratch_dir.display().to_string(),
            source,
        })?;

        let env = candidate.to_env(&self.env_prefix);
        let order = self.case_order(seed);
        let mut mean = RunningMean::new();
        let mut results = Vec::with_capacity(order.len());

        for (index, ordinal) in order.into_iter().enumerate() {
            let step = index + 1;
            let case = self.suite.case(ordinal);
            if !case.input_path.is_file() {
                return Err(EvalError::MissingInput {
                    case: case.id,
                    path: case.input_path,
                });
            }

            let output_path = self.scratch_output_path();
            let result = self.executor.run_case(&case, &output_path, &env).await;
            remove_scratch(&output_path);
            let result = result?;

            let running = mean.push(result.score);
            results.push(result);
            reporter.report(step, running).await?;

            if reporter.should_prune(step).await? {
                tracing::info!(case = %case.id, step, value = running, "Pruned");
                return Ok(EvaluationOutcome {
                    aggregate_score: running,
                    case_results: results,
                    pruned: true,
                    pruned_at_case: Some(case.id),
                    pruned_at_step: Some(step),
                });
            }
        }

        Ok(EvaluationOutcome::completed(mean.mean(), results))
    }

    fn scratch_output_path(&self) -> PathBuf {
        let id = Uuid::new_v4().simple().to_string();
        self.scratch_dir.join(format!("{}.txt", &id[..8]))
    }
}

fn remove_scratch(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "Failed to remove scratch output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;
    use crate::runner::{CaseSettings, ScorePolicy};
    use crate::search::session::MockTrialReporter;
    use std::time::Duration;

    fn evaluator(dir: &Path, case_count: usize) -> CandidateEvaluator {
        let executor = CaseExecutor::new(CaseSettings {
            executable: dir.join("solution"),
            judge: dir.join("judge"),
            score_marker: "Score =".into(),
            policy: ScorePolicy::for_direction(Direction::Maximize),
            deadline: Duration::from_secs(1),
            margin_ratio: 0.05,
        });
        CandidateEvaluator::new(
            executor,
            TestSuite::new(dir.join("in"), case_count),
            dir.join("scratch"),
            "HP_",
        )
    }

    #[test]
    fn test_seeded_order_is_a_reproducible_permutation() {
        let dir = tempfile::TempDir::new().unwrap();
        let evaluator = evaluator(dir.path(), 20);

        let a = evaluator.case_order(Some(42));
        let b = evaluator.case_order(Some(42));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_missing_input_aborts_before_reporting() {
        let dir = tempfile::TempDir::new().unwrap();
        let evaluator = evaluator(dir.path(), 3);

        let mut reporter = MockTrialReporter::new();
        reporter.expect_report().never();
        reporter.expect_should_prune().never();

        let result = evaluator
            .evaluate(&CandidateParameterSet::new(), Some(1), &mut reporter)
            .await;
        assert!(matches!(result, Err(EvalError::MissingInput { .. })));
    }
}

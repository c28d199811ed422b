//! Running one test case: program, judge, classification

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RunnerError;
use super::judge::JudgeRunner;
use super::process::ProcessRunner;
use crate::config::{Direction, TunerConfig};
use crate::metrics::{CaseResult, FailureKind};

/// Failure score used when maximizing
pub const MAXIMIZE_FAILURE_SCORE: f64 = -1.0;

/// Failure score used when minimizing
pub const MINIMIZE_FAILURE_SCORE: f64 = 1_000_000_000.0;

/// Ordinal of a test case, displayed zero-padded to four digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CaseId(u32);

impl CaseId {
    pub fn new(ordinal: u32) -> Self {
        Self(ordinal)
    }

    pub fn ordinal(&self) -> u32 {
        self.0
    }

    /// File name used for this case's input and output
    pub fn file_name(&self) -> String {
        format!("{}.txt", self)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for CaseId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(CaseId)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for CaseId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A test case and its input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: CaseId,
    pub input_path: PathBuf,
}

/// How judge scores turn into aggregation scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePolicy {
    /// Score assigned to failed cases
    pub failure_score: f64,
    /// Scores at or below this value fail; `None` accepts any score
    pub valid_above: Option<i64>,
}

impl ScorePolicy {
    /// Default policy for an optimization direction
    pub fn for_direction(direction: Direction) -> Self {
        let failure_score = match direction {
            Direction::Maximize => MAXIMIZE_FAILURE_SCORE,
            Direction::Minimize => MINIMIZE_FAILURE_SCORE,
        };
        Self {
            failure_score,
            valid_above: Some(0),
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        let mut policy = Self::for_direction(config.problem.objective);
        if let Some(score) = config.search.failure_score {
            policy.failure_score = score;
        }
        policy.valid_above = config
            .search
            .reject_invalid_scores
            .then_some(config.search.valid_above);
        policy
    }

    fn accepts(&self, score: i64) -> bool {
        self.valid_above.is_none_or(|floor| score > floor)
    }
}

/// Everything needed to run and judge cases for one study
#[derive(Debug, Clone)]
pub struct CaseSettings {
    pub executable: PathBuf,
    pub judge: PathBuf,
    pub score_marker: String,
    pub policy: ScorePolicy,
    /// Per-case deadline before the margin is applied
    pub deadline: Duration,
    pub margin_ratio: f64,
}

impl CaseSettings {
    /// Settings for `executable` with everything else from the config
    pub fn from_config(config: &TunerConfig, executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            judge: config.judge_path(),
            score_marker: config.problem.score_prefix.clone(),
            policy: ScorePolicy::from_config(config),
            deadline: config.deadline(),
            margin_ratio: config.search.timeout_margin_ratio,
        }
    }
}

/// Runs single cases end to end
#[derive(Debug, Clone)]
pub struct CaseExecutor {
    settings: CaseSettings,
}

impl CaseExecutor {
    pub fn new(settings: CaseSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CaseSettings {
        &self.settings
    }

    /// Run `case`, writing the program's stdout to `output_path`
    ///
    /// Timeouts, judge failures and invalid scores are classified in the
    /// returned result. Only supervisor failures are errors.
    pub async fn run_case(
        &self,
        case: &TestCase,
        output_path: &Path,
        env: &[(String, String)],
    ) -> Result<CaseResult, RunnerError> {
        let settings = &self.settings;

        let stdin = File::open(&case.input_path).map_err(|source| RunnerError::Io {
            path: case.input_path.display().to_string(),
            source,
        })?;
        let stdout = File::create(output_path).map_err(|source| RunnerError::Io {
            path: output_path.display().to_string(),
            source,
        })?;

        let outcome = ProcessRunner::run(
            &settings.executable,
            &[],
            env,
            stdin,
            stdout,
            settings.deadline,
            settings.margin_ratio,
        )
        .await?;
        let elapsed_ms = outcome.elapsed_ms();

        let failed = |failure, raw_score| CaseResult {
            case_id: case.id,
            score: settings.policy.failure_score,
            raw_score,
            elapsed_ms,
            failure,
        };

        if outcome.timed_out {
            tracing::debug!(case = %case.id, elapsed_ms, "Case timed out");
            return Ok(failed(FailureKind::Timeout, None));
        }

        let score = JudgeRunner::extract_score(
            &settings.judge,
            &case.input_path,
            output_path,
            &settings.score_marker,
        )
        .await?;

        let result = match score {
            None => failed(FailureKind::JudgeFailure, None),
            Some(raw) if !settings.policy.accepts(raw) => {
                failed(FailureKind::NonPositiveScore, Some(raw))
            }
            Some(raw) => CaseResult {
                case_id: case.id,
                score: raw as f64,
                raw_score: Some(raw),
                elapsed_ms,
                failure: FailureKind::None,
            },
        };

        tracing::debug!(
            case = %case.id,
            score = result.score,
            elapsed_ms,
            failure = result.failure.label(),
            "Case finished"
        );
        Ok(result)
    }
}

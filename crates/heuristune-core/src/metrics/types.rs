//! Per-case and per-candidate result types

use serde::{Deserialize, Serialize};

use crate::runner::CaseId;

/// Why a case did not produce a usable score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Case scored normally
    #[default]
    None,
    /// Program exceeded its wall-clock limit
    Timeout,
    /// Judge failed or printed no parsable score
    JudgeFailure,
    /// Judge score at or below the validity floor
    NonPositiveScore,
}

impl FailureKind {
    pub fn is_failure(&self) -> bool {
        !matches!(self, FailureKind::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::None => "ok",
            FailureKind::Timeout => "timeout",
            FailureKind::JudgeFailure => "judge failure",
            FailureKind::NonPositiveScore => "invalid score",
        }
    }
}

/// Result of running one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: CaseId,

    /// Score used for aggregation; the failure score when `failure` is set
    pub score: f64,

    /// Score printed by the judge, if any
    pub raw_score: Option<i64>,

    /// Wall-clock time of the program run in milliseconds
    pub elapsed_ms: f64,

    pub failure: FailureKind,
}

impl CaseResult {
    pub fn succeeded(&self) -> bool {
        !self.failure.is_failure()
    }
}

/// Result of evaluating one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// Mean of all case scores, failure scores included
    pub aggregate_score: f64,

    /// Results in evaluation order
    pub case_results: Vec<CaseResult>,

    pub pruned: bool,

    /// Case after which the evaluation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruned_at_case: Option<CaseId>,

    /// Number of cases evaluated when pruning happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruned_at_step: Option<usize>,
}

impl EvaluationOutcome {
    pub fn completed(aggregate_score: f64, case_results: Vec<CaseResult>) -> Self {
        Self {
            aggregate_score,
            case_results,
            pruned: false,
            pruned_at_case: None,
            pruned_at_step: None,
        }
    }
}

//! Aggregation of case results
//!
//! Two policies live here. The running mean used during a search includes
//! failure scores, so a failing candidate is pushed toward the bottom of
//! the ranking. The batch summary used for reporting excludes failures
//! from the score totals and counts them separately.

use serde::{Deserialize, Serialize};

use super::types::{CaseResult, EvaluationOutcome, FailureKind};
use crate::runner::CaseId;

/// Incremental arithmetic mean
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value and return the updated mean
    pub fn push(&mut self, value: f64) -> f64 {
        self.sum += value;
        self.count += 1;
        self.mean()
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Summary of a batch of case results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub case_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub timeout_count: usize,
    pub judge_failure_count: usize,
    pub non_positive_count: usize,

    /// Sum of scores over successful cases
    pub total_score: f64,

    /// Mean score over successful cases, 0 when none succeeded
    pub mean_score: f64,

    /// Longest run over every case, timeouts included
    pub max_elapsed_ms: f64,
    pub max_elapsed_case: Option<CaseId>,
}

impl BatchSummary {
    pub fn from_cases(results: &[CaseResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add(result);
        }
        summary.finish()
    }

    /// Summary over every case of every outcome
    pub fn from_outcomes(outcomes: &[EvaluationOutcome]) -> Self {
        let mut summary = Self::default();
        for result in outcomes.iter().flat_map(|o| o.case_results.iter()) {
            summary.add(result);
        }
        summary.finish()
    }

    fn add(&mut self, result: &CaseResult) {
        self.case_count += 1;

        match result.failure {
            FailureKind::None => {
                self.success_count += 1;
                self.total_score += result.score;
            }
            FailureKind::Timeout => self.timeout_count += 1,
            FailureKind::JudgeFailure => self.judge_failure_count += 1,
            FailureKind::NonPositiveScore => self.non_positive_count += 1,
        }
        if result.failure.is_failure() {
            self.failure_count += 1;
        }

        if self.max_elapsed_case.is_none() || result.elapsed_ms > self.max_elapsed_ms {
            self.max_elapsed_ms = result.elapsed_ms;
            self.max_elapsed_case = Some(result.case_id);
        }
    }

    fn finish(mut self) -> Self {
        self.mean_score = if self.success_count > 0 {
            self.total_score / self.success_count as f64
        } else {
            0.0
        };
        self
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }
}

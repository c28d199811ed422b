use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::CandidateParameterSet;

/// Row id of a trial
pub type TrialId = i64;

/// Lifecycle state of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Running,
    Complete,
    Pruned,
    Failed,
}

impl TrialState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialState::Running => "running",
            TrialState::Complete => "complete",
            TrialState::Pruned => "pruned",
            TrialState::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, TrialState::Running)
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(TrialState::Running),
            "complete" => Ok(TrialState::Complete),
            "pruned" => Ok(TrialState::Pruned),
            "failed" => Ok(TrialState::Failed),
            other => Err(format!("unknown trial state: {}", other)),
        }
    }
}

/// A stored trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: TrialId,
    /// 0-based ordinal within the study
    pub number: i64,
    pub state: TrialState,
    pub value: Option<f64>,
    pub params: CandidateParameterSet,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// Trial counts and the best trial of a study
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    pub study_name: String,
    pub complete: usize,
    pub pruned: usize,
    pub failed: usize,
    pub running: usize,
    pub best: Option<TrialRecord>,
}

impl StudySummary {
    pub fn total(&self) -> usize {
        self.complete + self.pruned + self.failed + self.running
    }
}

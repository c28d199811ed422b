//! Case results and their aggregation

mod aggregator;
mod types;

pub use aggregator::{BatchSummary, RunningMean};
pub use types::{CaseResult, EvaluationOutcome, FailureKind};

//! Heuristune engine
//!
//! Runs a compiled heuristic solution against many test inputs under a time
//! budget, scores each run with an external judge, and drives a parameter
//! search over the solution's tunable constants.
//!
//! # Features
//!
//! - **Bounded execution**: wall-clock limits with a margin, file-backed
//!   stdin/stdout, timeouts classified per case
//! - **Judging**: score extraction from a marker line of the judge's output
//! - **Search**: random sampling, median pruning, parallel workers sharing a
//!   SQLite study store
//! - **Study directories**: frozen executable and schema per study, best
//!   parameters written back when the search ends
//! - **Reports**: terminal table, JSON and Markdown pretest summaries
//!
//! # Example
//!
//! ```rust,ignore
//! use heuristune_core::{StudyManager, StudySelection, Tuner, TunerConfig};
//!
//! let config = TunerConfig::load("heuristune.toml")?;
//! let manager = StudyManager::new(&config);
//! let artifact = manager.prepare_study(StudySelection::Fresh).await?;
//! let tuner = Tuner::new(&config, artifact.clone())?;
//! let summary = tuner.run(config.search.trials, config.effective_jobs()).await?;
//! if let Some(best) = summary.best {
//!     manager.finalize(&artifact, &best.params, best.value.unwrap_or_default())?;
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod schema;
pub mod search;
pub mod store;
pub mod study;

// Re-exports for convenience
pub use config::{ConfigError, Direction, PrunerKind, TunerConfig};
pub use metrics::{BatchSummary, CaseResult, EvaluationOutcome, FailureKind};
pub use report::{BatchReport, ReportFormat, generate_report};
pub use runner::{
    CaseExecutor, CaseId, CaseSettings, PretestRunner, RunnerError, ScorePolicy, TestCase,
    TestSuite,
};
pub use schema::{CandidateParameterSet, ParamKind, ParamValue, ParameterSchema, ParameterSpec};
pub use search::{CandidateEvaluator, EvalError, Sampler, Pruner, TrialReporter, Tuner};
pub use store::{StoreError, StudyStore, StudySummary, TrialState};
pub use study::{StudyArtifact, StudyError, StudyManager, StudySelection};

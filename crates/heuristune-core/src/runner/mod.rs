//! Process supervision: running the program, judging its output, batches
//!
//! Failures that describe a case (timeout, missing score) are values in
//! [`crate::metrics::CaseResult`]. [`RunnerError`] is reserved for the
//! supervisor itself failing.

mod batch;
mod build;
mod case;
mod generator;
mod judge;
mod process;
mod suite;

pub use batch::{CaseProgress, PretestRunner};
pub use build::{BuildError, Builder};
pub use case::{
    CaseExecutor, CaseId, CaseSettings, MAXIMIZE_FAILURE_SCORE, MINIMIZE_FAILURE_SCORE,
    ScorePolicy, TestCase,
};
pub use generator::{CaseGenerator, GenerateError};
pub use judge::{JudgeRunner, parse_score};
pub use process::{DEFAULT_MARGIN_RATIO, ProcessOutcome, ProcessRunner};
pub use suite::TestSuite;

/// Supervisor failures
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

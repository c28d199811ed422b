//! Parameter search: sampling, pruning, candidate evaluation and the
//! parallel driver

mod evaluator;
mod pruner;
mod sampler;
mod session;
mod tuner;

pub use evaluator::{CandidateEvaluator, EvalError};
pub use pruner::{MedianPruner, NopPruner, PruneContext, Pruner, pruner_for};
pub use sampler::{RandomSampler, Sampler};
pub use session::{TrialReporter, TrialSession};
pub use tuner::{TrialCallback, TrialEvent, TuneError, Tuner};

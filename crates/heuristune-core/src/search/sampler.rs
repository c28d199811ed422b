//! Parameter sampling

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::schema::{CandidateParameterSet, ParamKind, ParamValue, ParameterSchema};

/// Proposes the next candidate to evaluate
pub trait Sampler: Send + Sync {
    /// Candidate with every parameter of `schema` set; fixed parameters
    /// keep their stored value
    fn suggest(&self, schema: &ParameterSchema) -> CandidateParameterSet;
}

/// Independent uniform draws, log-uniform for log-scaled floats
pub struct RandomSampler {
    rng: Mutex<StdRng>,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Sampler for RandomSampler {
    fn suggest(&self, schema: &ParameterSchema) -> CandidateParameterSet {
        let mut rng = self.rng.lock();
        let mut candidate = CandidateParameterSet::new();

        for spec in schema.params() {
            let value = if !spec.searchable {
                spec.default_value()
            } else {
                match spec.kind {
                    ParamKind::Int { lower, upper, .. } => {
                        ParamValue::Int(rng.gen_range(lower..=upper))
                    }
                    ParamKind::Float {
                        lower, upper, log, ..
                    } => {
                        let v = if log {
                            rng.gen_range(lower.ln()..=upper.ln()).exp()
                        } else {
                            rng.gen_range(lower..=upper)
                        };
                        ParamValue::Float(v.clamp(lower, upper))
                    }
                }
            };
            candidate.insert(spec.name.clone(), value);
        }

        candidate
    }
}

//! Early stopping of unpromising trials

use crate::config::{Direction, PrunerKind};
use crate::store::{StoreResult, StudyStore, TrialId};

/// What a pruner sees when asked about a running trial
pub struct PruneContext<'a> {
    pub store: &'a StudyStore,
    pub trial: TrialId,
    /// Number of cases evaluated so far
    pub step: usize,
    /// Running mean after `step` cases
    pub value: f64,
}

/// Decides whether a running trial should stop
pub trait Pruner: Send + Sync {
    fn should_prune(&self, ctx: &PruneContext<'_>) -> StoreResult<bool>;
}

/// Never prunes
pub struct NopPruner;

impl Pruner for NopPruner {
    fn should_prune(&self, _ctx: &PruneContext<'_>) -> StoreResult<bool> {
        Ok(false)
    }
}

/// Prunes a trial whose running value is worse than the median of the
/// completed trials at the same step
pub struct MedianPruner {
    warmup_steps: usize,
    direction: Direction,
}

impl MedianPruner {
    pub fn new(warmup_steps: usize, direction: Direction) -> Self {
        Self {
            warmup_steps,
            direction,
        }
    }
}

impl Pruner for MedianPruner {
    fn should_prune(&self, ctx: &PruneContext<'_>) -> StoreResult<bool> {
        if ctx.step < self.warmup_steps {
            return Ok(false);
        }

        let mut values = ctx.store.completed_values_at(ctx.step, ctx.trial)?;
        let Some(median) = median(&mut values) else {
            return Ok(false);
        };

        let prune = self.direction.is_better(median, ctx.value);
        if prune {
            tracing::debug!(
                trial = ctx.trial,
                step = ctx.step,
                value = ctx.value,
                median,
                "Trial below median"
            );
        }
        Ok(prune)
    }
}

/// Build the configured pruner
pub fn pruner_for(kind: PrunerKind, warmup_steps: usize, direction: Direction) -> Box<dyn Pruner> {
    match kind {
        PrunerKind::None => Box::new(NopPruner),
        PrunerKind::Median => Box::new(MedianPruner::new(warmup_steps, direction)),
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

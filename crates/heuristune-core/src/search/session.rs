//! The link between a running evaluation and the study

use std::sync::Arc;

use async_trait::async_trait;

use super::pruner::{PruneContext, Pruner};
use crate::store::{self, StoreResult, StudyStore, TrialId};

/// Receives intermediate values of an evaluation and answers whether it
/// should stop
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrialReporter: Send {
    /// Report the running mean after `step` cases
    async fn report(&mut self, step: usize, value: f64) -> StoreResult<()>;

    /// Whether the trial should stop after `step` cases
    async fn should_prune(&mut self, step: usize) -> StoreResult<bool>;
}

/// Reporter for one stored trial
///
/// Store writes and pruner queries run on the blocking pool.
pub struct TrialSession {
    store: Arc<StudyStore>,
    pruner: Arc<dyn Pruner>,
    trial: TrialId,
    last: Option<(usize, f64)>,
}

impl TrialSession {
    pub fn new(store: Arc<StudyStore>, pruner: Arc<dyn Pruner>, trial: TrialId) -> Self {
        Self {
            store,
            pruner,
            trial,
            last: None,
        }
    }

    pub fn trial(&self) -> TrialId {
        self.trial
    }
}

#[async_trait]
impl TrialReporter for TrialSession {
    async fn report(&mut self, step: usize, value: f64) -> StoreResult<()> {
        let trial = self.trial;
        store::blocking(&self.store, move |s| {
            s.record_intermediate(trial, step, value)
        })
        .await?;
        self.last = Some((step, value));
        Ok(())
    }

    async fn should_prune(&mut self, step: usize) -> StoreResult<bool> {
        let value = match self.last {
            Some((reported, value)) if reported == step => value,
            _ => return Ok(false),
        };
        let pruner = Arc::clone(&self.pruner);
        let trial = self.trial;
        store::blocking(&self.store, move |store| {
            pruner.should_prune(&PruneContext {
                store,
                trial,
                step,
                value,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;
    use crate::schema::CandidateParameterSet;
    use crate::search::pruner::{MedianPruner, NopPruner};
    use crate::store::TrialState;
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_records_and_prunes() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = StudyStore::open(
            dir.path().join("study.db"),
            "s",
            Direction::Maximize,
            Duration::from_secs(5),
        )
        .unwrap();

        let done = store.create_trial(&CandidateParameterSet::new()).unwrap();
        store.record_intermediate(done, 1, 100.0).unwrap();
        store.finish_trial(done, TrialState::Complete, Some(100.0)).unwrap();

        let store = Arc::new(store);
        let pruner = Arc::new(MedianPruner::new(1, Direction::Maximize));
        let trial = store.create_trial(&CandidateParameterSet::new()).unwrap();
        let mut session = TrialSession::new(Arc::clone(&store), pruner, trial);

        // No value reported for this step yet
        assert!(!session.should_prune(1).await.unwrap());

        session.report(1, 50.0).await.unwrap();
        assert!(session.should_prune(1).await.unwrap());
        assert_eq!(store.intermediate_values(trial).unwrap(), vec![(1, 50.0)]);
    }

    #[tokio::test]
    async fn test_nop_session_never_prunes() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = StudyStore::open(
            dir.path().join("study.db"),
            "s",
            Direction::Minimize,
            Duration::from_secs(5),
        )
        .unwrap();
        let trial = store.create_trial(&CandidateParameterSet::new()).unwrap();
        let mut session = TrialSession::new(Arc::new(store), Arc::new(NopPruner), trial);

        session.report(1, 1e9).await.unwrap();
        assert!(!session.should_prune(1).await.unwrap());
        assert_eq!(session.trial(), trial);
    }
}

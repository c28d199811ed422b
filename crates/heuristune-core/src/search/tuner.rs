//! Parallel search driver
//!
//! `jobs` workers pull trial slots from a shared counter until the budget is
//! spent or the run is cancelled. Each worker opens its own store handle, so
//! the database file is the only state the workers share. Store calls run on
//! the blocking pool since a busy database holds them for up to the lock
//! timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::evaluator::{CandidateEvaluator, EvalError};
use super::pruner::{Pruner, pruner_for};
use super::sampler::{RandomSampler, Sampler};
use super::session::TrialSession;
use crate::config::{Direction, TunerConfig};
use crate::runner::{CaseExecutor, CaseSettings, TestSuite};
use crate::schema::{CandidateParameterSet, ParameterSchema, SchemaError};
use crate::store::{self, StoreError, StudyStore, StudySummary, TrialState};
use crate::study::StudyArtifact;

/// Errors that abort a search run
#[derive(Debug, thiserror::Error)]
pub enum TuneError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Outcome of one finished trial
#[derive(Debug, Clone)]
pub struct TrialEvent {
    pub number: i64,
    pub state: TrialState,
    pub value: f64,
    pub params: CandidateParameterSet,
    /// Best completed value so far, if any
    pub best_value: Option<f64>,
}

/// Callback invoked after every finished trial
pub type TrialCallback = Arc<dyn Fn(TrialEvent) + Send + Sync>;

/// Runs trials against one study
pub struct Tuner {
    inner: TunerInner,
    cancel: CancellationToken,
}

#[derive(Clone)]
struct TunerInner {
    artifact: StudyArtifact,
    schema: ParameterSchema,
    evaluator: CandidateEvaluator,
    sampler: Arc<dyn Sampler>,
    pruner: Arc<dyn Pruner>,
    direction: Direction,
    lock_timeout: Duration,
    seed: Option<u64>,
    progress: Option<TrialCallback>,
}

impl Tuner {
    /// Build a tuner for `artifact` with the sampler and pruner from `config`
    pub fn new(config: &TunerConfig, artifact: StudyArtifact) -> Result<Self, TuneError> {
        let schema = ParameterSchema::load(&artifact.schema_path)?;
        let executor = CaseExecutor::new(CaseSettings::from_config(
            config,
            &artifact.executable_path,
        ));
        let evaluator = CandidateEvaluator::new(
            executor,
            TestSuite::new(config.input_dir(), config.search.case_count),
            artifact.dir.join("scratch"),
            config.search.env_prefix.clone(),
        );
        let direction = config.problem.objective;

        Ok(Self {
            inner: TunerInner {
                artifact,
                schema,
                evaluator,
                sampler: Arc::new(RandomSampler::new(config.search.seed)),
                pruner: Arc::from(pruner_for(
                    config.search.pruner,
                    config.search.warmup_steps,
                    direction,
                )),
                direction,
                lock_timeout: Duration::from_secs(config.search.lock_timeout_secs),
                seed: config.search.seed,
                progress: None,
            },
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.inner.sampler = sampler;
        self
    }

    pub fn with_pruner(mut self, pruner: Arc<dyn Pruner>) -> Self {
        self.inner.pruner = pruner;
        self
    }

    pub fn set_progress_callback(&mut self, callback: TrialCallback) {
        self.inner.progress = Some(callback);
    }

    /// Token that stops new trials from starting when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn artifact(&self) -> &StudyArtifact {
        &self.inner.artifact
    }

    /// Run up to `trials` trials on `jobs` workers and summarize the study
    ///
    /// The first supervisor error cancels the remaining launches and is
    /// returned once in-flight trials have finished.
    pub async fn run(&self, trials: usize, jobs: usize) -> Result<StudySummary, TuneError> {
        let workers = jobs.max(1).min(trials);
        tracing::info!(
            study = %self.inner.artifact.name,
            trials,
            workers,
            searchable = self.inner.schema.searchable().count(),
            "Starting search"
        );

        let shared = Arc::new(self.inner.clone());
        let next = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();
        for worker in 0..workers {
            let inner = Arc::clone(&shared);
            let next = Arc::clone(&next);
            let cancel = self.cancel.clone();
            set.spawn(async move { inner.work(worker, trials, next, cancel).await });
        }

        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let result = joined
                .map_err(|e| TuneError::Worker(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker failed, stopping search");
                self.cancel.cancel();
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let store = self.inner.open_store().await?;
        let summary = store::blocking(&store, |s| s.summary()).await?;
        tracing::info!(
            complete = summary.complete,
            pruned = summary.pruned,
            failed = summary.failed,
            best = ?summary.best.as_ref().and_then(|t| t.value),
            "Search finished"
        );
        Ok(summary)
    }
}

impl TunerInner {
    async fn open_store(&self) -> Result<Arc<StudyStore>, StoreError> {
        let path = self.artifact.store_path.clone();
        let name = self.artifact.name.clone();
        let (direction, lock_timeout) = (self.direction, self.lock_timeout);
        let store = tokio::task::spawn_blocking(move || {
            StudyStore::open(&path, &name, direction, lock_timeout)
        })
        .await??;
        Ok(Arc::new(store))
    }

    async fn work(
        &self,
        worker: usize,
        trials: usize,
        next: Arc<AtomicUsize>,
        cancel: CancellationToken,
    ) -> Result<(), TuneError> {
        let store = self.open_store().await?;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(worker, "Cancelled, no new trials");
                break;
            }
            if next.fetch_add(1, Ordering::SeqCst) >= trials {
                break;
            }
            let event = self.run_trial(&store).await?;
            if let Some(progress) = &self.progress {
                progress(event);
            }
        }
        Ok(())
    }

    async fn run_trial(&self, store: &Arc<StudyStore>) -> Result<TrialEvent, TuneError> {
        let params = self.sampler.suggest(&self.schema);
        let trial = {
            let params = params.clone();
            store::blocking(store, move |s| s.create_trial(&params)).await?
        };
        let mut session = TrialSession::new(Arc::clone(store), Arc::clone(&self.pruner), trial);

        let outcome = match self.evaluator.evaluate(&params, self.seed, &mut session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let failed = move |s: &StudyStore| s.finish_trial(trial, TrialState::Failed, None);
                if let Err(store_err) = store::blocking(store, failed).await {
                    tracing::warn!(trial, error = %store_err, "Failed to mark trial as failed");
                }
                return Err(e.into());
            }
        };

        let state = if outcome.pruned {
            TrialState::Pruned
        } else {
            TrialState::Complete
        };
        let value = outcome.aggregate_score;
        let (record, best) = store::blocking(store, move |s| {
            s.finish_trial(trial, state, Some(value))?;
            Ok((s.trial(trial)?, s.best_trial()?))
        })
        .await?;
        let best_value = best.and_then(|t| t.value);
        tracing::info!(
            trial = record.number,
            state = %state,
            value,
            params = %params,
            "Trial finished"
        );

        Ok(TrialEvent {
            number: record.number,
            state,
            value,
            params,
            best_value,
        })
    }
}

//! Candidate evaluation: running means, pruning, scratch files

#![cfg(unix)]

mod common;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::Workspace;
use heuristune_core::config::Direction;
use heuristune_core::metrics::FailureKind;
use heuristune_core::runner::{CaseExecutor, CaseId, CaseSettings, RunnerError, TestSuite};
use heuristune_core::schema::{CandidateParameterSet, ParamValue};
use heuristune_core::search::{CandidateEvaluator, EvalError, TrialReporter};
use heuristune_core::store::StoreResult;

/// Records reports and prunes at a fixed step
#[derive(Default)]
struct RecordingReporter {
    reports: Vec<(usize, f64)>,
    prune_checks: Vec<usize>,
    prune_at: Option<usize>,
}

#[async_trait]
impl TrialReporter for RecordingReporter {
    async fn report(&mut self, step: usize, value: f64) -> StoreResult<()> {
        self.reports.push((step, value));
        Ok(())
    }

    async fn should_prune(&mut self, step: usize) -> StoreResult<bool> {
        self.prune_checks.push(step);
        Ok(self.prune_at == Some(step))
    }
}

fn evaluator(ws: &Workspace, executor: CaseExecutor, case_count: usize) -> CandidateEvaluator {
    CandidateEvaluator::new(
        executor,
        TestSuite::new(ws.config.input_dir(), case_count),
        ws.root().join("scratch"),
        "HP_",
    )
}

fn candidate(mult: i64) -> CandidateParameterSet {
    CandidateParameterSet::new().with("mult", ParamValue::Int(mult))
}

#[tokio::test]
async fn test_running_means_include_failure_scores() {
    let ws = Workspace::new(Direction::Maximize, &["10", "20", "sleep"]);
    let evaluator = evaluator(&ws, ws.executor(Duration::from_millis(200)), 3);
    let scores: HashMap<u32, f64> = [(0, 10.0), (1, 20.0), (2, -1.0)].into_iter().collect();

    let mut reporter = RecordingReporter::default();
    let outcome = evaluator
        .evaluate(&candidate(1), Some(11), &mut reporter)
        .await
        .unwrap();

    let order = evaluator.case_order(Some(11));
    let mut sum = 0.0;
    let expected: Vec<(usize, f64)> = order
        .iter()
        .enumerate()
        .map(|(i, ordinal)| {
            sum += scores[ordinal];
            (i + 1, sum / (i + 1) as f64)
        })
        .collect();

    assert_eq!(reporter.reports, expected);
    assert_eq!(reporter.prune_checks, vec![1, 2, 3]);
    assert!(!outcome.pruned);
    assert_eq!(outcome.aggregate_score, 29.0 / 3.0);
    assert_eq!(outcome.case_results.len(), 3);

    let timeout = outcome
        .case_results
        .iter()
        .find(|r| r.case_id == CaseId::new(2))
        .unwrap();
    assert_eq!(timeout.failure, FailureKind::Timeout);
}

#[tokio::test]
async fn test_prune_stops_after_current_case() {
    let ws = Workspace::new(Direction::Maximize, &["1", "2", "3", "4"]);
    let evaluator = evaluator(&ws, ws.executor(Duration::from_secs(2)), 4);

    let mut reporter = RecordingReporter {
        prune_at: Some(2),
        ..Default::default()
    };
    let outcome = evaluator
        .evaluate(&candidate(10), Some(3), &mut reporter)
        .await
        .unwrap();

    let order = evaluator.case_order(Some(3));
    assert!(outcome.pruned);
    assert_eq!(outcome.pruned_at_step, Some(2));
    assert_eq!(outcome.pruned_at_case, Some(CaseId::new(order[1])));
    assert_eq!(outcome.case_results.len(), 2);
    assert_eq!(reporter.reports.len(), 2);

    let expected = ((order[0] + 1) as f64 * 10.0 + (order[1] + 1) as f64 * 10.0) / 2.0;
    assert_eq!(outcome.aggregate_score, expected);
}

#[tokio::test]
async fn test_scratch_outputs_are_removed() {
    let ws = Workspace::new(Direction::Maximize, &["1", "2"]);
    let evaluator = evaluator(&ws, ws.executor(Duration::from_secs(2)), 2);

    evaluator
        .evaluate(&candidate(1), None, &mut RecordingReporter::default())
        .await
        .unwrap();

    let leftovers = std::fs::read_dir(ws.root().join("scratch")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_missing_input_aborts_evaluation() {
    let ws = Workspace::new(Direction::Maximize, &["1", "2", "3"]);
    std::fs::remove_file(ws.config.input_dir().join("0001.txt")).unwrap();
    let evaluator = evaluator(&ws, ws.executor(Duration::from_secs(2)), 3);

    let result = evaluator
        .evaluate(&candidate(1), Some(5), &mut RecordingReporter::default())
        .await;
    match result {
        Err(EvalError::MissingInput { case, .. }) => assert_eq!(case, CaseId::new(1)),
        other => panic!("expected missing input, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_executable_is_a_supervisor_error() {
    let ws = Workspace::new(Direction::Minimize, &["1"]);
    let executor = CaseExecutor::new(CaseSettings {
        executable: ws.root().join("does-not-exist"),
        ..ws.executor(Duration::from_secs(1)).settings().clone()
    });
    let evaluator = evaluator(&ws, executor, 1);

    let mut reporter = RecordingReporter::default();
    let result = evaluator.evaluate(&candidate(1), None, &mut reporter).await;

    assert!(matches!(
        result,
        Err(EvalError::Runner(RunnerError::Spawn { .. }))
    ));
    assert!(reporter.reports.is_empty());
}

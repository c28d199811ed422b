//! SQLite-backed study store
//!
//! One database file per study directory holds the study row, every trial
//! with its parameters and final value, and the intermediate values reported
//! while a trial runs. Several workers and processes may write to the same
//! file: the database runs in WAL mode, waits up to the configured lock
//! timeout for a busy writer, and takes write locks up front for trial
//! creation and completion.

mod types;

pub use types::{StudySummary, TrialId, TrialRecord, TrialState};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use crate::config::Direction;
use crate::schema::CandidateParameterSet;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Study {study} was created to {stored}, cannot {requested} it")]
    DirectionMismatch {
        study: String,
        stored: Direction,
        requested: Direction,
    },

    #[error("Corrupt store: {0}")]
    Corrupt(String),

    #[error("Trial {0} not found")]
    TrialNotFound(TrialId),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS studies (
    study_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    direction   TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS trials (
    trial_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    study_id    INTEGER NOT NULL REFERENCES studies(study_id),
    number      INTEGER NOT NULL,
    state       TEXT NOT NULL,
    value       REAL,
    params      TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    UNIQUE (study_id, number)
);
CREATE TABLE IF NOT EXISTS trial_intermediate_values (
    trial_id    INTEGER NOT NULL REFERENCES trials(trial_id),
    step        INTEGER NOT NULL,
    value       REAL NOT NULL,
    PRIMARY KEY (trial_id, step)
);
CREATE INDEX IF NOT EXISTS idx_trials_study_state ON trials (study_id, state);
";

const TRIAL_COLUMNS: &str =
    "trial_id, number, state, value, params, started_at, finished_at";

/// Run a store operation on the blocking pool
///
/// Store calls may wait up to the lock timeout for another writer, which
/// must not stall an async worker thread.
pub async fn blocking<T, F>(store: &Arc<StudyStore>, op: F) -> StoreResult<T>
where
    F: FnOnce(&StudyStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store)).await?
}

/// Handle to one study inside a store file
///
/// Each worker opens its own handle; the connection is not shared across
/// workers.
pub struct StudyStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    study_id: i64,
    study_name: String,
    direction: Direction,
}

impl StudyStore {
    /// Open the store and load the study, creating both if absent
    pub fn open(
        path: impl AsRef<Path>,
        study_name: &str,
        direction: Direction,
        lock_timeout: Duration,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(lock_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        conn.execute_batch(SCHEMA)?;

        conn.execute(
            "INSERT OR IGNORE INTO studies (name, direction, created_at) VALUES (?1, ?2, ?3)",
            params![study_name, direction.as_str(), Utc::now().to_rfc3339()],
        )?;
        let (study_id, stored): (i64, String) = conn.query_row(
            "SELECT study_id, direction FROM studies WHERE name = ?1",
            params![study_name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let stored: Direction = stored
            .parse()
            .map_err(|e: crate::config::ConfigError| StoreError::Corrupt(e.to_string()))?;
        if stored != direction {
            return Err(StoreError::DirectionMismatch {
                study: study_name.to_string(),
                stored,
                requested: direction,
            });
        }

        tracing::debug!(path = %path.display(), study = study_name, study_id, "Opened study store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            study_id,
            study_name: study_name.to_string(),
            direction,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn study_name(&self) -> &str {
        &self.study_name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Register a new running trial and return its id
    pub fn create_trial(&self, params: &CandidateParameterSet) -> StoreResult<TrialId> {
        let params_json = serde_json::to_string(params)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(number) + 1, 0) FROM trials WHERE study_id = ?1",
            params![self.study_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO trials (study_id, number, state, params, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.study_id,
                number,
                TrialState::Running.as_str(),
                params_json,
                Utc::now().to_rfc3339()
            ],
        )?;
        let trial_id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(trial = trial_id, number, "Created trial");
        Ok(trial_id)
    }

    /// Store the running value of a trial after `step` cases
    pub fn record_intermediate(&self, trial: TrialId, step: usize, value: f64) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO trial_intermediate_values (trial_id, step, value)
             VALUES (?1, ?2, ?3)",
            params![trial, step as i64, value],
        )?;
        Ok(())
    }

    /// Move a trial to its final state
    pub fn finish_trial(
        &self,
        trial: TrialId,
        state: TrialState,
        value: Option<f64>,
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
            "UPDATE trials SET state = ?1, value = ?2, finished_at = ?3
             WHERE trial_id = ?4 AND study_id = ?5",
            params![
                state.as_str(),
                value,
                Utc::now().to_rfc3339(),
                trial,
                self.study_id
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::TrialNotFound(trial));
        }
        tx.commit()?;
        Ok(())
    }

    /// Values reported at `step` by completed trials other than `exclude`
    pub fn completed_values_at(&self, step: usize, exclude: TrialId) -> StoreResult<Vec<f64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT iv.value FROM trial_intermediate_values iv
             JOIN trials t ON t.trial_id = iv.trial_id
             WHERE t.study_id = ?1 AND t.state = ?2 AND iv.step = ?3 AND t.trial_id != ?4",
        )?;
        let values = stmt
            .query_map(
                params![
                    self.study_id,
                    TrialState::Complete.as_str(),
                    step as i64,
                    exclude
                ],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(values)
    }

    /// Intermediate values of one trial, ordered by step
    pub fn intermediate_values(&self, trial: TrialId) -> StoreResult<Vec<(usize, f64)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT step, value FROM trial_intermediate_values WHERE trial_id = ?1 ORDER BY step",
        )?;
        let values = stmt
            .query_map(params![trial], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    pub fn trial(&self, trial: TrialId) -> StoreResult<TrialRecord> {
        let raw = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!(
                    "SELECT {} FROM trials WHERE trial_id = ?1 AND study_id = ?2",
                    TRIAL_COLUMNS
                ),
                params![trial, self.study_id],
                RawTrialRow::from_row,
            )
            .optional()?
        };
        raw.ok_or(StoreError::TrialNotFound(trial))?.into_record()
    }

    /// All trials of the study in creation order
    pub fn trials(&self) -> StoreResult<Vec<TrialRecord>> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM trials WHERE study_id = ?1 ORDER BY number",
                TRIAL_COLUMNS
            ))?;
            stmt.query_map(params![self.study_id], RawTrialRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        rows.into_iter().map(RawTrialRow::into_record).collect()
    }

    /// Best completed trial for the study's direction
    ///
    /// Pruned and failed trials never qualify. Ties go to the earlier trial.
    pub fn best_trial(&self) -> StoreResult<Option<TrialRecord>> {
        let order = match self.direction {
            Direction::Maximize => "DESC",
            Direction::Minimize => "ASC",
        };
        let raw = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!(
                    "SELECT {} FROM trials
                     WHERE study_id = ?1 AND state = ?2 AND value IS NOT NULL
                     ORDER BY value {}, number ASC LIMIT 1",
                    TRIAL_COLUMNS, order
                ),
                params![self.study_id, TrialState::Complete.as_str()],
                RawTrialRow::from_row,
            )
            .optional()?
        };
        raw.map(RawTrialRow::into_record).transpose()
    }

    pub fn count_by_state(&self, state: TrialState) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM trials WHERE study_id = ?1 AND state = ?2",
            params![self.study_id, state.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn summary(&self) -> StoreResult<StudySummary> {
        Ok(StudySummary {
            study_name: self.study_name.clone(),
            complete: self.count_by_state(TrialState::Complete)?,
            pruned: self.count_by_state(TrialState::Pruned)?,
            failed: self.count_by_state(TrialState::Failed)?,
            running: self.count_by_state(TrialState::Running)?,
            best: self.best_trial()?,
        })
    }
}

struct RawTrialRow {
    id: i64,
    number: i64,
    state: String,
    value: Option<f64>,
    params: String,
    started_at: String,
    finished_at: Option<String>,
}

impl RawTrialRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            number: row.get(1)?,
            state: row.get(2)?,
            value: row.get(3)?,
            params: row.get(4)?,
            started_at: row.get(5)?,
            finished_at: row.get(6)?,
        })
    }

    fn into_record(self) -> StoreResult<TrialRecord> {
        Ok(TrialRecord {
            id: self.id,
            number: self.number,
            state: self.state.parse().map_err(StoreError::Corrupt)?,
            value: self.value,
            params: serde_json::from_str(&self.params)?,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamValue;
    use tempfile::TempDir;

    fn open(dir: &TempDir, direction: Direction) -> StudyStore {
        StudyStore::open(
            dir.path().join("study.db"),
            "study_test",
            direction,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn params(x: i64) -> CandidateParameterSet {
        CandidateParameterSet::new().with("x", ParamValue::Int(x))
    }

    #[test]
    fn test_trial_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, Direction::Maximize);

        let trial = store.create_trial(&params(3)).unwrap();
        store.record_intermediate(trial, 1, 10.0).unwrap();
        store.record_intermediate(trial, 2, 15.0).unwrap();
        store
            .finish_trial(trial, TrialState::Complete, Some(15.0))
            .unwrap();

        let record = store.trial(trial).unwrap();
        assert_eq!(record.number, 0);
        assert_eq!(record.state, TrialState::Complete);
        assert_eq!(record.value, Some(15.0));
        assert_eq!(record.params, params(3));
        assert!(record.finished_at.is_some());
        assert_eq!(
            store.intermediate_values(trial).unwrap(),
            vec![(1, 10.0), (2, 15.0)]
        );
    }

    #[test]
    fn test_best_trial_respects_direction_and_state() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, Direction::Maximize);

        let a = store.create_trial(&params(1)).unwrap();
        store.finish_trial(a, TrialState::Complete, Some(100.0)).unwrap();
        let b = store.create_trial(&params(2)).unwrap();
        store.finish_trial(b, TrialState::Pruned, Some(500.0)).unwrap();
        let c = store.create_trial(&params(3)).unwrap();
        store.finish_trial(c, TrialState::Complete, Some(200.0)).unwrap();
        let d = store.create_trial(&params(4)).unwrap();
        store.finish_trial(d, TrialState::Failed, None).unwrap();

        let best = store.best_trial().unwrap().unwrap();
        assert_eq!(best.id, c);

        let summary = store.summary().unwrap();
        assert_eq!(summary.complete, 2);
        assert_eq!(summary.pruned, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_best_trial_minimize() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, Direction::Minimize);

        for (x, value) in [(1, 30.0), (2, 10.0), (3, 20.0)] {
            let t = store.create_trial(&params(x)).unwrap();
            store.finish_trial(t, TrialState::Complete, Some(value)).unwrap();
        }
        let best = store.best_trial().unwrap().unwrap();
        assert_eq!(best.params, params(2));
    }

    #[test]
    fn test_reopen_loads_existing_study() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir, Direction::Maximize);
            let t = store.create_trial(&params(1)).unwrap();
            store.finish_trial(t, TrialState::Complete, Some(1.0)).unwrap();
        }
        let store = open(&dir, Direction::Maximize);
        assert_eq!(store.trials().unwrap().len(), 1);

        let next = store.create_trial(&params(2)).unwrap();
        assert_eq!(store.trial(next).unwrap().number, 1);
    }

    #[test]
    fn test_direction_mismatch() {
        let dir = TempDir::new().unwrap();
        drop(open(&dir, Direction::Maximize));

        let result = StudyStore::open(
            dir.path().join("study.db"),
            "study_test",
            Direction::Minimize,
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(StoreError::DirectionMismatch { .. })));
    }

    #[test]
    fn test_completed_values_exclude_running_and_self() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, Direction::Maximize);

        let done = store.create_trial(&params(1)).unwrap();
        store.record_intermediate(done, 3, 42.0).unwrap();
        store.finish_trial(done, TrialState::Complete, Some(40.0)).unwrap();

        let running = store.create_trial(&params(2)).unwrap();
        store.record_intermediate(running, 3, 7.0).unwrap();

        assert_eq!(store.completed_values_at(3, running).unwrap(), vec![42.0]);
        assert!(store.completed_values_at(3, done).unwrap().is_empty());
        assert!(store.completed_values_at(4, running).unwrap().is_empty());
    }

    #[test]
    fn test_finish_unknown_trial() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, Direction::Maximize);
        let result = store.finish_trial(999, TrialState::Complete, Some(1.0));
        assert!(matches!(result, Err(StoreError::TrialNotFound(999))));
    }

    #[tokio::test]
    async fn test_blocking_waits_off_the_runtime_thread() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir, Direction::Maximize));
        let locker = Connection::open(dir.path().join("study.db")).unwrap();
        locker.execute_batch("BEGIN IMMEDIATE").unwrap();

        let pending = tokio::spawn({
            let store = Arc::clone(&store);
            async move { blocking(&store, |s| s.create_trial(&params(1))).await }
        });

        // The only runtime thread keeps running while the writer waits
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!pending.is_finished());
        locker.execute_batch("COMMIT").unwrap();

        let trial = pending.await.unwrap().unwrap();
        assert_eq!(store.trial(trial).unwrap().number, 0);
    }
}

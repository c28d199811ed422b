//! Study directories
//!
//! A study directory freezes what a search runs against: a copy of the
//! compiled solution, a copy of the parameter schema and the study store.
//! Once created, workers only read the directory; the schema copy is
//! rewritten once when the search is finalized.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;

use crate::config::{Direction, TunerConfig};
use crate::runner::{BuildError, Builder};
use crate::schema::{CandidateParameterSet, ParameterSchema, SchemaError, extract_params};
use crate::store::{StoreError, StudyStore};

/// Prefix of generated study names
pub const STUDY_PREFIX: &str = "study_";

/// Study errors
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Study directory already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("No studies found under {0}")]
    NoStudies(PathBuf),

    #[error("Study {dir} is missing {missing}")]
    Incomplete { dir: PathBuf, missing: PathBuf },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StudyError + '_ {
    move |source| StudyError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Which study a run works on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StudySelection {
    /// New timestamped study
    #[default]
    Fresh,
    /// Study with this directory name, created if absent
    Named(String),
    /// Lexicographically last existing study
    Last,
}

/// Immutable inputs of one study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyArtifact {
    pub name: String,
    pub dir: PathBuf,
    pub executable_path: PathBuf,
    pub schema_path: PathBuf,
    pub store_path: PathBuf,
}

/// Creates, resumes and finalizes study directories
pub struct StudyManager {
    study_root: PathBuf,
    solution_path: PathBuf,
    params_path: PathBuf,
    source_path: PathBuf,
    store_file: String,
    builder: Builder,
    direction: Direction,
    lock_timeout: Duration,
}

impl StudyManager {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            study_root: config.study_root(),
            solution_path: config.solution_path(),
            params_path: config.params_path(),
            source_path: config.source_path(),
            store_file: config.files.store.clone(),
            builder: Builder::new(config.build.command.clone(), config.work_dir()),
            direction: config.problem.objective,
            lock_timeout: Duration::from_secs(config.search.lock_timeout_secs),
        }
    }

    pub fn study_root(&self) -> &Path {
        &self.study_root
    }

    /// Existing study directory names, sorted
    pub fn list_studies(&self) -> Result<Vec<String>, StudyError> {
        if !self.study_root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.study_root).map_err(io_error(&self.study_root))? {
            let entry = entry.map_err(io_error(&self.study_root))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve `selection` to a ready study, creating it if needed
    ///
    /// An existing directory is reused as-is. A new one gets a fresh build,
    /// copies of the executable and schema, and an initialized store.
    pub async fn prepare_study(
        &self,
        selection: StudySelection,
    ) -> Result<StudyArtifact, StudyError> {
        let name = match selection {
            StudySelection::Fresh => {
                format!("{}{}", STUDY_PREFIX, Local::now().format("%Y%m%d_%H%M%S"))
            }
            StudySelection::Named(name) => {
                let artifact = self.artifact_for(&name);
                if artifact.dir.is_dir() {
                    return self.resume(artifact);
                }
                name
            }
            StudySelection::Last => {
                let name = self
                    .list_studies()?
                    .pop()
                    .ok_or_else(|| StudyError::NoStudies(self.study_root.clone()))?;
                return self.resume(self.artifact_for(&name));
            }
        };

        self.create(self.artifact_for(&name)).await
    }

    fn artifact_for(&self, name: &str) -> StudyArtifact {
        let dir = self.study_root.join(name);
        let executable_name = self
            .solution_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("solution"));
        let schema_name = self
            .params_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("params.json"));
        StudyArtifact {
            name: name.to_string(),
            executable_path: dir.join(executable_name),
            schema_path: dir.join(schema_name),
            store_path: dir.join(&self.store_file),
            dir,
        }
    }

    fn resume(&self, artifact: StudyArtifact) -> Result<StudyArtifact, StudyError> {
        for required in [&artifact.executable_path, &artifact.schema_path] {
            if !required.is_file() {
                return Err(StudyError::Incomplete {
                    dir: artifact.dir.clone(),
                    missing: required.clone(),
                });
            }
        }
        // Opening validates the direction and creates the store if it was lost
        self.open_store(&artifact)?;
        tracing::info!(study = %artifact.name, dir = %artifact.dir.display(), "Resuming study");
        Ok(artifact)
    }

    async fn create(&self, artifact: StudyArtifact) -> Result<StudyArtifact, StudyError> {
        if artifact.dir.exists() {
            return Err(StudyError::AlreadyExists(artifact.dir));
        }

        let schema = self.root_schema()?;
        self.builder.build(&self.solution_path).await?;

        std::fs::create_dir_all(&self.study_root).map_err(io_error(&self.study_root))?;
        std::fs::create_dir(&artifact.dir).map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                StudyError::AlreadyExists(artifact.dir.clone())
            } else {
                io_error(&artifact.dir)(source)
            }
        })?;

        std::fs::copy(&self.solution_path, &artifact.executable_path)
            .map_err(io_error(&artifact.executable_path))?;
        schema.save(&artifact.schema_path)?;
        self.open_store(&artifact)?;

        tracing::info!(
            study = %artifact.name,
            dir = %artifact.dir.display(),
            params = schema.len(),
            "Created study"
        );
        Ok(artifact)
    }

    /// Root schema file, or the schema extracted from the source
    fn root_schema(&self) -> Result<ParameterSchema, StudyError> {
        if self.params_path.is_file() {
            return Ok(ParameterSchema::load(&self.params_path)?);
        }
        tracing::info!(
            source = %self.source_path.display(),
            "No parameter schema found, extracting from source"
        );
        let source =
            std::fs::read_to_string(&self.source_path).map_err(io_error(&self.source_path))?;
        Ok(extract_params(&source)?)
    }

    /// Open a store handle for the study
    pub fn open_store(&self, artifact: &StudyArtifact) -> Result<StudyStore, StudyError> {
        Ok(StudyStore::open(
            &artifact.store_path,
            &artifact.name,
            self.direction,
            self.lock_timeout,
        )?)
    }

    /// Write the best values into the study schema and the root schema
    pub fn finalize(
        &self,
        artifact: &StudyArtifact,
        best: &CandidateParameterSet,
        best_score: f64,
    ) -> Result<(), StudyError> {
        let mut targets = vec![artifact.schema_path.clone()];
        if self.params_path.is_file() {
            targets.push(self.params_path.clone());
        }

        for path in targets {
            let mut schema = ParameterSchema::load(&path)?;
            schema.apply_best(best, best_score);
            schema.save(&path)?;
            tracing::info!(path = %path.display(), best_score, "Wrote best parameters");
        }
        Ok(())
    }
}

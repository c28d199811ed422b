//! Tuner configuration
//!
//! Loaded from `heuristune.toml`. Every relative path resolves against the
//! directory holding the config file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "heuristune.toml";

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0} (run `heuristune init` first)")]
    NotFound(PathBuf),

    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Optimization direction of the judge score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[serde(alias = "max")]
    Maximize,
    #[serde(alias = "min")]
    Minimize,
}

impl Direction {
    /// Whether `a` is a strictly better objective value than `b`
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        match self {
            Direction::Maximize => a > b,
            Direction::Minimize => a < b,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Maximize => "maximize",
            Direction::Minimize => "minimize",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max" | "maximize" => Ok(Direction::Maximize),
            "min" | "minimize" => Ok(Direction::Minimize),
            other => Err(ConfigError::Invalid(format!(
                "objective must be max/maximize or min/minimize, got '{}'",
                other
            ))),
        }
    }
}

/// Which built-in pruner the tuner uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunerKind {
    None,
    Median,
}

/// Directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Parent directory of all study directories
    #[serde(default = "default_study_root")]
    pub study_root: PathBuf,
}

/// File names, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Executable produced by the build command
    #[serde(default = "default_solution")]
    pub solution: PathBuf,

    #[serde(default = "default_generator")]
    pub generator: PathBuf,

    #[serde(default = "default_judge")]
    pub judge: PathBuf,

    /// Parameter schema (JSON)
    #[serde(default = "default_params")]
    pub params: PathBuf,

    /// Study store file name inside a study directory
    #[serde(default = "default_store")]
    pub store: String,
}

/// Problem definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemConfig {
    #[serde(default = "default_objective")]
    pub objective: Direction,

    /// Contest time limit in milliseconds
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,

    /// Number of cases run by `heuristune test`
    #[serde(default = "default_pretest_count")]
    pub pretest_count: usize,

    /// Prefix of the judge output line carrying the score
    #[serde(default = "default_score_prefix")]
    pub score_prefix: String,
}

/// Build step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Program and arguments, run in the working directory
    #[serde(default = "default_build_command")]
    pub command: Vec<String>,
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Concurrent evaluations (0 = available parallelism)
    #[serde(default)]
    pub jobs: usize,

    /// Cases evaluated per trial
    #[serde(default = "default_case_count")]
    pub case_count: usize,

    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// Fixes the case order of every trial when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Deadline = time_limit_ms * timeout_factor
    #[serde(default = "default_timeout_factor")]
    pub timeout_factor: f64,

    #[serde(default = "default_timeout_margin_ratio")]
    pub timeout_margin_ratio: f64,

    /// Overrides the direction-derived failure score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_score: Option<f64>,

    /// Scores at or below this value count as failures
    #[serde(default)]
    pub valid_above: i64,

    /// Disable to accept any score the judge reports
    #[serde(default = "default_reject_invalid_scores")]
    pub reject_invalid_scores: bool,

    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    #[serde(default = "default_pruner")]
    pub pruner: PrunerKind,

    /// Steps reported before the pruner may stop a trial
    #[serde(default = "default_warmup_steps")]
    pub warmup_steps: usize,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("in")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_study_root() -> PathBuf {
    PathBuf::from("studies")
}

fn default_source() -> PathBuf {
    PathBuf::from("main.cpp")
}

fn default_solution() -> PathBuf {
    PathBuf::from("solution")
}

fn default_generator() -> PathBuf {
    PathBuf::from("gen")
}

fn default_judge() -> PathBuf {
    PathBuf::from("vis")
}

fn default_params() -> PathBuf {
    PathBuf::from("params.json")
}

fn default_store() -> String {
    "study.db".to_string()
}

fn default_objective() -> Direction {
    Direction::Maximize
}

fn default_time_limit_ms() -> u64 {
    2000
}

fn default_pretest_count() -> usize {
    150
}

fn default_score_prefix() -> String {
    "Score =".to_string()
}

fn default_build_command() -> Vec<String> {
    ["g++", "main.cpp", "-O2", "-o", "solution"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_trials() -> usize {
    500
}

fn default_case_count() -> usize {
    50
}

fn default_env_prefix() -> String {
    "HP_".to_string()
}

fn default_timeout_factor() -> f64 {
    2.5
}

fn default_timeout_margin_ratio() -> f64 {
    0.05
}

fn default_reject_invalid_scores() -> bool {
    true
}

fn default_lock_timeout_secs() -> u64 {
    20
}

fn default_pruner() -> PrunerKind {
    PrunerKind::Median
}

fn default_warmup_steps() -> usize {
    5
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            study_root: default_study_root(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            solution: default_solution(),
            generator: default_generator(),
            judge: default_judge(),
            params: default_params(),
            store: default_store(),
        }
    }
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            objective: default_objective(),
            time_limit_ms: default_time_limit_ms(),
            pretest_count: default_pretest_count(),
            score_prefix: default_score_prefix(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: default_build_command(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            jobs: 0,
            case_count: default_case_count(),
            env_prefix: default_env_prefix(),
            seed: None,
            timeout_factor: default_timeout_factor(),
            timeout_margin_ratio: default_timeout_margin_ratio(),
            failure_score: None,
            valid_above: 0,
            reject_invalid_scores: default_reject_invalid_scores(),
            lock_timeout_secs: default_lock_timeout_secs(),
            pruner: default_pruner(),
            warmup_steps: default_warmup_steps(),
        }
    }
}

/// Full tuner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunerConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub problem: ProblemConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub search: SearchConfig,

    /// Directory every relative path resolves against
    #[serde(skip)]
    work_dir: PathBuf,
}

impl TunerConfig {
    /// Create a config for the given objective and time limit
    pub fn new(objective: Direction, time_limit_ms: u64) -> Self {
        let mut config = Self::default();
        config.problem.objective = objective;
        config.problem.time_limit_ms = time_limit_ms;
        config
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: TunerConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let work_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.work_dir = work_dir;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.problem.time_limit_ms == 0 {
            return Err(ConfigError::Invalid(
                "problem.time_limit_ms must be positive".to_string(),
            ));
        }
        if !(self.search.timeout_factor > 0.0) {
            return Err(ConfigError::Invalid(
                "search.timeout_factor must be positive".to_string(),
            ));
        }
        if !(self.search.timeout_margin_ratio >= 0.0) {
            return Err(ConfigError::Invalid(
                "search.timeout_margin_ratio must not be negative".to_string(),
            ));
        }
        if self.search.case_count == 0 {
            return Err(ConfigError::Invalid(
                "search.case_count must be at least 1".to_string(),
            ));
        }
        if self.build.command.is_empty() {
            return Err(ConfigError::Invalid(
                "build.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the working directory
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Set the search seed
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.search.seed = seed;
        }
        self
    }

    /// Set concurrent evaluations
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if let Some(jobs) = jobs {
            self.search.jobs = jobs;
        }
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix(mut self, prefix: Option<String>) -> Self {
        if let Some(prefix) = prefix {
            self.search.env_prefix = prefix;
        }
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Resolve a path against the working directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.resolve(&self.paths.input_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.paths.output_dir)
    }

    pub fn study_root(&self) -> PathBuf {
        self.resolve(&self.paths.study_root)
    }

    pub fn solution_path(&self) -> PathBuf {
        self.resolve(&self.files.solution)
    }

    pub fn judge_path(&self) -> PathBuf {
        self.resolve(&self.files.judge)
    }

    pub fn generator_path(&self) -> PathBuf {
        self.resolve(&self.files.generator)
    }

    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.files.source)
    }

    pub fn params_path(&self) -> PathBuf {
        self.resolve(&self.files.params)
    }

    /// Per-case deadline before the margin is applied
    pub fn deadline(&self) -> Duration {
        let ms = self.problem.time_limit_ms as f64 * self.search.timeout_factor;
        Duration::from_secs_f64(ms / 1000.0)
    }

    /// Effective worker count
    pub fn effective_jobs(&self) -> usize {
        if self.search.jobs > 0 {
            self.search.jobs
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

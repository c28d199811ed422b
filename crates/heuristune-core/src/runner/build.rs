//! Compiling the candidate program

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Errors from the build step
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Build command is empty")]
    EmptyCommand,

    #[error("Failed to start build command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build failed with exit code {code:?}\n{stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Build succeeded but {0} was not produced")]
    MissingOutput(PathBuf),
}

/// Runs the configured build command in the working directory
#[derive(Debug, Clone)]
pub struct Builder {
    command: Vec<String>,
    work_dir: PathBuf,
}

impl Builder {
    pub fn new(command: Vec<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
        }
    }

    /// Run the build and check that `artifact` exists afterwards
    pub async fn build(&self, artifact: &Path) -> Result<(), BuildError> {
        let (program, args) = self.command.split_first().ok_or(BuildError::EmptyCommand)?;

        tracing::info!(command = %self.command.join(" "), "Building solution");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        if !artifact.is_file() {
            return Err(BuildError::MissingOutput(artifact.to_path_buf()));
        }

        tracing::info!(artifact = %artifact.display(), "Build finished");
        Ok(())
    }
}

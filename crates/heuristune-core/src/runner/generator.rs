//! Input generation through the problem's generator executable

use std::fmt::Write as _;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use super::case::CaseId;

/// Errors from case generation
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid seed range {start}..{end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start generator {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Generator exited with code {0:?}")]
    Failed(Option<i32>),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Generates inputs `L..R` into the input directory
///
/// The generator is invoked as `<generator> <seed file> --dir=<dir>` and is
/// expected to write `0000.txt`, `0001.txt`, ... for the seeds in order.
#[derive(Debug, Clone)]
pub struct CaseGenerator {
    generator: PathBuf,
    input_dir: PathBuf,
    work_dir: PathBuf,
}

impl CaseGenerator {
    pub fn new(
        generator: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generator: generator.into(),
            input_dir: input_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Generate the cases with ordinals in `seeds`, returning the written paths
    pub async fn generate(&self, seeds: Range<u32>) -> Result<Vec<PathBuf>, GenerateError> {
        if seeds.start > seeds.end {
            return Err(GenerateError::InvalidRange {
                start: seeds.start,
                end: seeds.end,
            });
        }

        // Scratch space next to the inputs so the final moves are renames
        let scratch = tempfile::Builder::new()
            .prefix("gen_")
            .tempdir_in(&self.work_dir)
            .map_err(io_error(&self.work_dir))?;
        let seed_file = scratch.path().join("seeds.txt");
        let out_dir = scratch.path().join("out");
        std::fs::create_dir_all(&out_dir).map_err(io_error(&out_dir))?;

        let mut seed_text = String::new();
        for seed in seeds.clone() {
            let _ = writeln!(seed_text, "{}", seed);
        }
        std::fs::write(&seed_file, seed_text).map_err(io_error(&seed_file))?;

        tracing::info!(
            generator = %self.generator.display(),
            start = seeds.start,
            end = seeds.end,
            "Generating test cases"
        );
        let status = Command::new(&self.generator)
            .arg(&seed_file)
            .arg(format!("--dir={}", out_dir.display()))
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| GenerateError::Spawn {
                program: self.generator.display().to_string(),
                source,
            })?;
        if !status.success() {
            return Err(GenerateError::Failed(status.code()));
        }

        std::fs::create_dir_all(&self.input_dir).map_err(io_error(&self.input_dir))?;
        let mut written = Vec::new();
        for (i, ordinal) in seeds.enumerate() {
            let src = out_dir.join(CaseId::new(i as u32).file_name());
            if !src.is_file() {
                tracing::warn!(case = %CaseId::new(ordinal), "Generator produced no input");
                continue;
            }
            let dst = self.input_dir.join(CaseId::new(ordinal).file_name());
            std::fs::rename(&src, &dst).map_err(io_error(&dst))?;
            written.push(dst);
        }

        Ok(written)
    }
}

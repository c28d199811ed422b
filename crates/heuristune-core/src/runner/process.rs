//! Bounded execution of the candidate program

use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use super::RunnerError;

/// Margin added on top of the deadline before a run counts as timed out
pub const DEFAULT_MARGIN_RATIO: f64 = 0.05;

/// How a bounded run ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessOutcome {
    /// Exit code, `None` when killed or terminated by a signal
    pub exit_code: Option<i32>,
    /// Measured wall-clock time
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProcessOutcome {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs one program with file-backed stdin/stdout under a wall-clock limit
pub struct ProcessRunner;

impl ProcessRunner {
    /// Effective limit for a deadline and margin
    pub fn limit(deadline: Duration, margin_ratio: f64) -> Duration {
        deadline.mul_f64(1.0 + margin_ratio.max(0.0))
    }

    /// Run `program`, streaming `stdin` in and `stdout` out
    ///
    /// Both file handles are consumed and closed on every path. stderr is
    /// discarded. A non-zero exit is reported, not returned as an error.
    pub async fn run(
        program: &Path,
        args: &[String],
        env: &[(String, String)],
        stdin: File,
        stdout: File,
        deadline: Duration,
        margin_ratio: f64,
    ) -> Result<ProcessOutcome, RunnerError> {
        let limit = Self::limit(deadline, margin_ratio);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: program.display().to_string(),
            source,
        })?;
        // The parent's copies of the stdio handles are released with `cmd`.
        drop(cmd);

        let (exit_code, mut timed_out) = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(source)) => {
                return Err(RunnerError::Wait {
                    program: program.display().to_string(),
                    source,
                });
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(program = %program.display(), error = %e, "Failed to kill timed out process");
                }
                (None, true)
            }
        };

        let elapsed = start.elapsed();
        if elapsed > limit {
            timed_out = true;
        }

        tracing::debug!(
            program = %program.display(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            exit_code = ?exit_code,
            timed_out,
            "Process finished"
        );

        Ok(ProcessOutcome {
            exit_code,
            elapsed,
            timed_out,
        })
    }
}

//! Shared fixtures: a tiny problem workspace driven by `/bin/sh` scripts

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use heuristune_core::config::{Direction, PrunerKind, TunerConfig};
use heuristune_core::runner::{CaseExecutor, CaseSettings, ScorePolicy};
use heuristune_core::schema::{ParameterSchema, ParameterSpec};
use tempfile::TempDir;

/// Reads one token from stdin.
/// - `sleep`: hangs for five seconds
/// - any other non-number: echoed back unchanged
/// - a number: printed multiplied by `$HP_mult` (default 1)
pub const SOLUTION: &str = r#"read n
case "$n" in
  sleep) exec sleep 5 ;;
  [!0-9-]*) echo "$n"; exit 0 ;;
esac
echo $((n * ${HP_mult:-1}))"#;

/// Prints `Score = <output>`, exits 1 when the output is `fail`
pub const JUDGE: &str = r#"s=$(cat "$2")
if [ "$s" = "fail" ]; then exit 1; fi
echo "debug: judging $1"
echo "Score = $s""#;

pub fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A problem workspace with solution, judge, config and inputs
pub struct Workspace {
    pub dir: TempDir,
    pub config: TunerConfig,
}

impl Workspace {
    /// Workspace whose inputs are `inputs[i]` written to `in/<i:04>.txt`
    pub fn new(direction: Direction, inputs: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        write_script(&root.join("solution.sh"), SOLUTION);
        write_script(&root.join("vis"), JUDGE);

        std::fs::create_dir_all(root.join("in")).unwrap();
        for (i, input) in inputs.iter().enumerate() {
            std::fs::write(root.join("in").join(format!("{:04}.txt", i)), format!("{}\n", input))
                .unwrap();
        }

        let mut config = TunerConfig::new(direction, 1000).with_work_dir(root);
        config.build.command = vec!["cp".into(), "solution.sh".into(), "solution".into()];
        config.search.timeout_factor = 1.0;
        config.search.case_count = inputs.len();
        config.problem.pretest_count = inputs.len();
        config.search.pruner = PrunerKind::None;
        config.search.seed = Some(7);

        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn solution(&self) -> PathBuf {
        self.root().join("solution.sh")
    }

    pub fn write_schema(&self, params: Vec<ParameterSpec>) {
        ParameterSchema::new(params)
            .unwrap()
            .save(self.config.params_path())
            .unwrap();
    }

    /// Executor running the solution script directly
    pub fn executor(&self, deadline: Duration) -> CaseExecutor {
        CaseExecutor::new(CaseSettings {
            executable: self.solution(),
            judge: self.config.judge_path(),
            score_marker: "Score =".into(),
            policy: ScorePolicy::for_direction(self.config.problem.objective),
            deadline,
            margin_ratio: 0.05,
        })
    }
}

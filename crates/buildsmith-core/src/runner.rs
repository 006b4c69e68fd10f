//! Build runner trait and subprocess runner.
//!
//! The runner is an external collaborator: given a build-configuration
//! document and an output destination it produces a compiled artifact or
//! fails. It is invoked out-of-process and has no enforced timeout; a hung
//! runner leaves its job Pending.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::RunnerError;

/// Trait for build runner backends.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Run a build with the given configuration document, writing the
    /// compiled artifact to `output_path`.
    async fn run(&self, config_path: &Path, output_path: &Path)
        -> Result<(), RunnerError>;
}

/// Runs the configured build command as a subprocess, appending the
/// configuration path and output path as the final two arguments.
pub struct ProcessBuildRunner {
    program: String,
    args: Vec<String>,
    work_dir: Option<PathBuf>,
}

impl ProcessBuildRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            work_dir: None,
        }
    }

    /// Run the command from `dir` (typically the unpacked release directory).
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl BuildRunner for ProcessBuildRunner {
    async fn run(&self, config_path: &Path, output_path: &Path)
        -> Result<(), RunnerError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(config_path).arg(output_path);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| RunnerError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(RunnerError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

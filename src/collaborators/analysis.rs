//! External technical-analysis job.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::CollaboratorConfig;

/// Output of a successful analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutput {
    /// Report text, verbatim
    pub stdout: String,
    /// Diagnostics the job printed while still succeeding
    pub stderr: String,
}

impl AnalysisOutput {
    /// Trimmed stderr, if the job wrote any.
    pub fn warnings(&self) -> Option<&str> {
        let trimmed = self.stderr.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Produces a free-text analysis report.
#[async_trait]
pub trait AnalysisRunner: Send + Sync {
    async fn run(&self) -> Result<AnalysisOutput>;
}

/// Runs a configured program and returns what it printed.
#[derive(Debug, Clone)]
pub struct CommandAnalysisRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAnalysisRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &CollaboratorConfig) -> Self {
        Self::new(
            config.analysis_program.clone(),
            config.analysis_args.clone(),
            Duration::from_secs(config.analysis_timeout_secs),
        )
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl AnalysisRunner for CommandAnalysisRunner {
    async fn run(&self) -> Result<AnalysisOutput> {
        let command = self.describe();
        log::info!("Running analysis: {}", command);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::collaborator("analysis", format!("spawn '{command}': {e}")))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output
                .map_err(|e| AppError::collaborator("analysis", format!("wait '{command}': {e}")))?,
            Err(_) => {
                return Err(AppError::collaborator(
                    "analysis",
                    format!("'{command}' exceeded {}s", self.timeout.as_secs()),
                ));
            }
        };

        let result = AnalysisOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if let Some(warnings) = result.warnings() {
            log::warn!("Analysis stderr: {}", warnings);
        }

        if !output.status.success() {
            let detail = match result.warnings() {
                Some(warnings) => format!("'{command}' exited with {}: {warnings}", output.status),
                None => format!("'{command}' exited with {}", output.status),
            };
            return Err(AppError::collaborator("analysis", detail));
        }

        Ok(result)
    }
}

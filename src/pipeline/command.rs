//! Local command execution for `Command` resources

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to start `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a shell command line, failing on non-zero exit
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError>;
}

/// Runs commands through `sh -c`
pub struct ShellCommandRunner {
    working_dir: Option<PathBuf>,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self { working_dir: None }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let shown = redact_secrets(command);
        info!(command = %shown, "Running command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| CommandError::Spawn {
            command: shown.clone(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: shown,
                status: output.status.to_string(),
                stderr: redact_secrets(stderr.trim()),
            });
        }

        debug!(command = %shown, stdout_len = stdout.len(), "Command finished");
        Ok(CommandOutput { stdout, stderr })
    }
}

/// Masks SAS signatures (`sig=...`) in a command line or message
pub fn redact_secrets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("sig=") {
        let value_start = pos + "sig=".len();
        out.push_str(&rest[..value_start]);
        out.push_str("REDACTED");
        let tail = &rest[value_start..];
        let value_end = tail
            .find(|c: char| c == '&' || c == '\'' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        rest = &tail[value_end..];
    }
    out.push_str(rest);
    out
}

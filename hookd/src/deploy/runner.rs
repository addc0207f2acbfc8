//! Shell command runner

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

use crate::errors::HookError;
use crate::journal::Journal;

/// Runs one external command in a working directory and resolves with its
/// captured stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, command: &str, working_dir: &Path) -> Result<String, HookError>;
}

/// Command runner backed by `sh -c`
pub struct ShellRunner {
    journal: Arc<Journal>,
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(journal: Arc<Journal>, timeout: Duration) -> Self {
        Self { journal, timeout }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn execute(&self, command: &str, working_dir: &Path) -> Result<String, HookError> {
        self.journal
            .record(&format!("Executing: {} in {}", command, working_dir.display()))
            .await;

        let mut cmd = Command::new("sh");
        cmd.args(["-c", command])
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future on timeout must also terminate the
            // child, not leave it running detached.
            .kill_on_drop(true);

        let output = match time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let message = format!("Failed to spawn command: {}", e);
                self.journal.record(&format!("Error: {}", message)).await;
                return Err(HookError::ExecError(message));
            }
            Err(_) => {
                self.journal
                    .record(&format!("Error: command timed out after {:?}", self.timeout))
                    .await;
                return Err(HookError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let message = match output.status.code() {
                Some(code) => format!("command exited with status {}", code),
                None => "command terminated by signal".to_string(),
            };
            self.journal.record(&format!("Error: {}", message)).await;
            if !stderr.trim().is_empty() {
                self.journal.record(&format!("Stderr: {}", stderr.trim_end())).await;
            }
            if !stdout.trim().is_empty() {
                self.journal.record(&format!("Stdout: {}", stdout.trim_end())).await;
            }
            return Err(HookError::ExecError(message));
        }

        // A command can write to stderr and still succeed
        if !stderr.trim().is_empty() {
            warn!("command wrote to stderr: {}", stderr.trim_end());
            self.journal.record(&format!("Stderr: {}", stderr.trim_end())).await;
        }
        if !stdout.trim().is_empty() {
            self.journal.record(&format!("Stdout: {}", stdout.trim_end())).await;
        }

        debug!("command succeeded in {}", working_dir.display());
        Ok(stdout)
    }
}

use crate::traits::{required_str, Action};
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tars_core::{truncate_chars, ActionError, ActionInput};
use tracing::info;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_STREAM_CHARS: usize = 4000;

/// Runs a shell command in the worker's working directory.
pub struct RunCommandAction {
    working_dir: PathBuf,
    timeout: Duration,
}

impl RunCommandAction {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Action for RunCommandAction {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the working directory and return its exit code and output"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command line passed to sh -c"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: &ActionInput) -> Result<String, ActionError> {
        let command = required_str(input, "command")?;
        if command.trim().is_empty() {
            return Err(ActionError::Validation("Command cannot be empty".to_string()));
        }

        info!("run_command: {}", command);
        let mut child = tokio::process::Command::new("sh");
        child
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, child.output())
            .await
            .map_err(|_| {
                ActionError::Execution(format!(
                    "Command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ActionError::Execution(e.to_string()))?;

        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = format!("exit code: {}", code);
        if !stdout.trim().is_empty() {
            result.push_str("\nstdout:\n");
            result.push_str(&truncate_chars(stdout.trim_end(), MAX_STREAM_CHARS));
        }
        if !stderr.trim().is_empty() {
            result.push_str("\nstderr:\n");
            result.push_str(&truncate_chars(stderr.trim_end(), MAX_STREAM_CHARS));
        }
        Ok(result)
    }
}

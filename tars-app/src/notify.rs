//! Progress notifiers. Delivery failures are logged and never reach the driver.

use crate::config::NotifierConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tars_core::ProgressNotifier;
use tracing::{info, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LogNotifier;

#[async_trait]
impl ProgressNotifier for LogNotifier {
    async fn notify(&self, text: &str) {
        info!(target: "tars::progress", "{}", text);
    }
}

/// Runs `program args... <text>` for every notification.
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProgressNotifier for CommandNotifier {
    async fn notify(&self, text: &str) {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).arg(text).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => {}
            Ok(Ok(output)) => warn!(
                "Notifier {} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Ok(Err(e)) => warn!("Notifier {} failed to start: {}", self.program, e),
            Err(_) => warn!(
                "Notifier {} timed out after {}s",
                self.program,
                self.timeout.as_secs()
            ),
        }
    }
}

pub fn build_notifier(config: &NotifierConfig) -> Arc<dyn ProgressNotifier> {
    match config {
        NotifierConfig::Log => Arc::new(LogNotifier),
        NotifierConfig::Command { program, args } => {
            Arc::new(CommandNotifier::new(program.clone(), args.clone()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_command_notifier_passes_text_as_last_arg() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("note.txt");
        let notifier = CommandNotifier::new(
            "sh",
            vec![
                "-c".to_string(),
                format!("printf '%s' \"$1\" > {}", out.display()),
                "notify".to_string(),
            ],
        );

        notifier.notify("coder round 3: file_write").await;
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "coder round 3: file_write");
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        CommandNotifier::new("/nonexistent/notifier", vec![]).notify("hi").await;
        CommandNotifier::new("sh", vec!["-c".to_string(), "exit 1".to_string()])
            .notify("hi")
            .await;
        CommandNotifier::new("sh", vec!["-c".to_string(), "sleep 5".to_string()])
            .with_timeout(Duration::from_millis(50))
            .notify("hi")
            .await;
    }
}

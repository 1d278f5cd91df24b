#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tars_app::commands::{run, workers};
use tars_app::config::AppConfig;
use tars_core::{
    load_worker_config, ActionCatalog, ActionInput, ActionRequest, CancellationSignal,
    ModelClient, ModelError, ModelReply, TerminalState, Transcript,
};
use tempfile::TempDir;

struct Script {
    replies: Mutex<VecDeque<ModelReply>>,
}

impl Script {
    fn new(replies: Vec<ModelReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl ModelClient for Script {
    async fn invoke(
        &self,
        _instructions: &str,
        _transcript: &Transcript,
        _catalog: &ActionCatalog,
    ) -> Result<ModelReply, ModelError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Fatal("script exhausted".to_string()))
    }
}

fn call(id: &str, name: &str, input: serde_json::Value) -> ModelReply {
    let input: ActionInput = match input {
        serde_json::Value::Object(map) => map,
        _ => ActionInput::new(),
    };
    ModelReply::with_requests(vec![ActionRequest::new(id, name, input)])
}

fn workspace(root: &Path) -> AppConfig {
    let workers_dir = root.join("workers");
    fs::create_dir(&workers_dir).unwrap();
    fs::write(workers_dir.join("files.md"), "You organise files.").unwrap();
    fs::write(
        workers_dir.join("files.yaml"),
        "name: files\ninstructions: files.md\nactions: [file_write, file_list]\nstep_limit: 5\n",
    )
    .unwrap();
    fs::write(workers_dir.join("broken.yaml"), "name: broken\n").unwrap();

    let mut config = AppConfig::from_yaml("provider:\n  base_url: http://localhost\n  model: m\n").unwrap();
    config.workers_dir = workers_dir;
    config.sandbox_dir = root.join("sandbox");
    config
}

#[tokio::test]
async fn test_run_writes_into_sandbox_and_succeeds() {
    let temp = TempDir::new().unwrap();
    let config = workspace(temp.path());
    let worker = load_worker_config(config.worker_path("files")).unwrap();

    let model = Script::new(vec![
        call("1", "file_write", json!({"path": "notes/todo.txt", "content": "buy milk"})),
        call("2", "file_list", json!({"path": "notes"})),
        call("3", "finish", json!({"summary": "Wrote notes/todo.txt and listed it to confirm."})),
    ]);

    let report = run::execute(
        &config,
        worker,
        model,
        None,
        CancellationSignal::new(),
        "write a todo note",
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.worker, "files");
    assert_eq!(report.actions, 2);
    assert_eq!(report.outcome.state(), TerminalState::Succeeded);
    assert_eq!(report.exit_code(), 0);
    assert!(report.finished_at >= report.started_at);
    assert_eq!(
        fs::read_to_string(config.sandbox_dir.join("notes/todo.txt")).unwrap(),
        "buy milk"
    );

    let printed = serde_json::to_value(&report).unwrap();
    assert_eq!(printed["outcome"]["state"], "succeeded");
}

#[tokio::test]
async fn test_unlisted_action_is_reported_back_not_fatal() {
    let temp = TempDir::new().unwrap();
    let config = workspace(temp.path());
    let worker = load_worker_config(config.worker_path("files")).unwrap();

    let model = Script::new(vec![
        call("1", "run_command", json!({"command": "ls"})),
        call("2", "give-up", json!({"reason": "no shell access"})),
    ]);

    let report = run::execute(&config, worker, model, None, CancellationSignal::new(), "x", None)
        .await
        .unwrap();

    assert_eq!(report.outcome.state(), TerminalState::Failed);
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.outcome.escalation_reason(), Some("no shell access"));
}

#[tokio::test]
async fn test_cancelled_run_exits_130() {
    let temp = TempDir::new().unwrap();
    let config = workspace(temp.path());
    let worker = load_worker_config(config.worker_path("files")).unwrap();
    let cancellation = CancellationSignal::new();
    cancellation.cancel();

    let report = run::execute(&config, worker, Script::new(vec![]), None, cancellation, "x", None)
        .await
        .unwrap();

    assert_eq!(report.outcome.state(), TerminalState::Aborted);
    assert_eq!(report.exit_code(), 130);
    assert_eq!(report.actions, 0);
}

#[test]
fn test_list_workers_includes_broken_profiles() {
    let temp = TempDir::new().unwrap();
    let config = workspace(temp.path());

    let entries = workers::list_workers(&config.workers_dir).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file, "broken.yaml");
    assert!(entries[0].error.is_some());
    assert_eq!(entries[1].name.as_deref(), Some("files"));
    assert_eq!(entries[1].actions, vec!["file_write", "file_list"]);

    let listing = workers::render(&entries);
    assert!(listing.contains("invalid"));
    assert!(listing.contains("files"));
}

use crate::traits::{required_str, Action};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use tars_core::{ActionError, ActionInput};

/// Resolve `path` inside `sandbox`. Absolute paths and `..` are refused.
fn resolve(sandbox: &Path, path: &str) -> Result<PathBuf, ActionError> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ActionError::PermissionDenied(format!(
            "Path outside sandbox: {}",
            path
        )));
    }
    Ok(sandbox.join(relative))
}

pub struct FileReadAction {
    sandbox_path: PathBuf,
}

impl FileReadAction {
    pub fn new(sandbox_path: PathBuf) -> Self {
        Self { sandbox_path }
    }
}

#[async_trait]
impl Action for FileReadAction {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read a text file from the sandbox directory"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to file (relative to sandbox)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: &ActionInput) -> Result<String, ActionError> {
        let path = required_str(input, "path")?;
        let full_path = resolve(&self.sandbox_path, path)?;

        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| ActionError::Execution(format!("{}: {}", path, e)))
    }
}

pub struct FileWriteAction {
    sandbox_path: PathBuf,
}

impl FileWriteAction {
    pub fn new(sandbox_path: PathBuf) -> Self {
        Self { sandbox_path }
    }
}

#[async_trait]
impl Action for FileWriteAction {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file in the sandbox directory, creating parent directories"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to file (relative to sandbox)"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, input: &ActionInput) -> Result<String, ActionError> {
        let path = required_str(input, "path")?;
        let content = required_str(input, "content")?;
        let full_path = resolve(&self.sandbox_path, path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ActionError::Execution(e.to_string()))?;
        }
        tokio::fs::write(&full_path, content)
            .await
            .map_err(|e| ActionError::Execution(format!("{}: {}", path, e)))?;

        Ok(format!("Wrote {} bytes to {}", content.len(), path))
    }
}

pub struct FileListAction {
    sandbox_path: PathBuf,
}

impl FileListAction {
    pub fn new(sandbox_path: PathBuf) -> Self {
        Self { sandbox_path }
    }
}

#[async_trait]
impl Action for FileListAction {
    fn name(&self) -> &str {
        "file_list"
    }

    fn description(&self) -> &str {
        "List entries of a directory in the sandbox. Directories end with '/'"
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path (relative to sandbox, default: root)",
                    "default": "."
                }
            }
        })
    }

    async fn execute(&self, input: &ActionInput) -> Result<String, ActionError> {
        let path = input.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let full_path = resolve(&self.sandbox_path, path)?;

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&full_path)
            .await
            .map_err(|e| ActionError::Execution(format!("{}: {}", path, e)))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ActionError::Execution(e.to_string()))?
        {
            let mut name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            entries.push(name);
        }

        if entries.is_empty() {
            return Ok(format!("{} is empty", path));
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tars_core::load_worker_config;

#[derive(Debug, Clone, Serialize)]
pub struct WorkerEntry {
    pub file: String,
    pub name: Option<String>,
    pub actions: Vec<String>,
    pub step_limit: Option<u32>,
    /// Why the profile failed to load.
    pub error: Option<String>,
}

/// Every `*.yaml` worker profile in `dir`, sorted by file name. Broken profiles are listed with their error.
pub fn list_workers(dir: &Path) -> Result<Vec<WorkerEntry>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read workers directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .collect();
    paths.sort();

    Ok(paths
        .iter()
        .map(|path| {
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            match load_worker_config(path) {
                Ok(worker) => WorkerEntry {
                    file,
                    name: Some(worker.name),
                    actions: worker.actions,
                    step_limit: Some(worker.step_limit),
                    error: None,
                },
                Err(e) => WorkerEntry {
                    file,
                    name: None,
                    actions: Vec::new(),
                    step_limit: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect())
}

/// Human-readable listing for the terminal.
pub fn render(entries: &[WorkerEntry]) -> String {
    if entries.is_empty() {
        return "No worker profiles found".to_string();
    }
    entries
        .iter()
        .map(|entry| match (&entry.name, &entry.error) {
            (Some(name), _) => format!(
                "{:<12} steps={:<3} actions: {}",
                name,
                entry.step_limit.unwrap_or_default(),
                entry.actions.join(", ")
            ),
            (None, error) => format!(
                "{:<12} invalid: {}",
                entry.file,
                error.as_deref().unwrap_or("unknown error")
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

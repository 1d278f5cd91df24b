//! Worker configuration loader.

use crate::driver::DriverOptions;
use crate::gate::FinishGate;
use crate::worker::{is_reserved, ActionSpec, WorkerError, WorkerIdentity, DEFAULT_STEP_LIMIT};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Config file is empty: {0}")]
    Empty(String),

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Config missing required field: {0}")]
    MissingField(&'static str),

    #[error("Instructions file not found: {0}")]
    InstructionsNotFound(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker profile loaded from YAML, with its instructions file already read.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub name: String,
    pub instructions: String,
    /// Names of the specific actions to expose, resolved by the caller's registry.
    pub actions: Vec<String>,
    pub step_limit: u32,
    pub notify_every: u32,
    pub finish_gate: FinishGate,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    name: String,
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    actions: Vec<String>,
    step_limit: Option<u32>,
    notify_every: Option<u32>,
    finish_gate: Option<FinishGate>,
}

impl WorkerConfig {
    /// Build the identity from already-resolved action specs.
    pub fn identity(&self, specs: Vec<ActionSpec>) -> Result<WorkerIdentity, WorkerError> {
        WorkerIdentity::new(&self.name, &self.instructions, specs, self.step_limit)
    }

    /// Driver options with this worker's overrides applied.
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            notify_every: self.notify_every,
            finish_gate: self.finish_gate.clone(),
            ..DriverOptions::default()
        }
    }
}

/// Load a worker profile from a YAML file.
///
/// The `instructions` path is resolved relative to the YAML file unless absolute.
pub fn load_worker_config(config_path: impl AsRef<Path>) -> Result<WorkerConfig, ConfigError> {
    let config_file = config_path.as_ref();
    let display = config_file.display().to_string();

    if !config_file.exists() {
        return Err(ConfigError::NotFound(display));
    }

    let content = std::fs::read_to_string(config_file)?;
    if content.trim().is_empty() {
        return Err(ConfigError::Empty(display));
    }

    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: display.clone(),
        source,
    })?;

    if raw.name.trim().is_empty() {
        return Err(ConfigError::MissingField("name"));
    }
    if raw.instructions.trim().is_empty() {
        return Err(ConfigError::MissingField("instructions"));
    }
    if let Some(reserved) = raw.actions.iter().find(|a| is_reserved(a)) {
        return Err(WorkerError::ReservedName(reserved.clone()).into());
    }

    let step_limit = raw.step_limit.unwrap_or(DEFAULT_STEP_LIMIT);
    if step_limit == 0 {
        return Err(WorkerError::InvalidStepLimit.into());
    }

    let instructions_path = if Path::new(&raw.instructions).is_absolute() {
        Path::new(&raw.instructions).to_path_buf()
    } else {
        config_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&raw.instructions)
    };

    if !instructions_path.exists() {
        return Err(ConfigError::InstructionsNotFound(
            instructions_path.display().to_string(),
        ));
    }

    let instructions = std::fs::read_to_string(&instructions_path)?;

    Ok(WorkerConfig {
        name: raw.name,
        instructions,
        actions: raw.actions,
        step_limit,
        notify_every: raw.notify_every.unwrap_or(3),
        finish_gate: raw.finish_gate.unwrap_or_default(),
    })
}

//! Worker identity: the immutable configuration a run is driven with.

use crate::cancel::CancellationSignal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Reserved action that ends the run successfully (subject to the finish gate).
pub const FINISH: &str = "finish";
/// Reserved action that ends the run with an escalation.
pub const GIVE_UP: &str = "give-up";

pub const DEFAULT_STEP_LIMIT: u32 = 40;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Worker name cannot be empty")]
    EmptyName,
    #[error("Action name '{0}' is reserved")]
    ReservedName(String),
    #[error("Duplicate action: {0}")]
    DuplicateAction(String),
    #[error("Step limit must be greater than zero")]
    InvalidStepLimit,
}

/// Description of one action offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the action input.
    pub parameters: Value,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved(&self.name)
    }

    pub fn finish() -> Self {
        Self::new(
            FINISH,
            "Call when the task is fully complete. Provide a specific summary of what was done and how it was verified.",
            json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "What was accomplished, with concrete details"
                    }
                },
                "required": ["summary"]
            }),
        )
    }

    pub fn give_up() -> Self {
        Self::new(
            GIVE_UP,
            "Call when the task cannot be completed. Explain what was tried and what blocked progress.",
            json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "description": "Why the task cannot be completed"
                    }
                },
                "required": ["reason"]
            }),
        )
    }

    /// Spec in OpenAI function format.
    pub fn to_function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

pub fn is_reserved(name: &str) -> bool {
    name == FINISH || name == GIVE_UP
}

/// A worker's specific actions plus the two reserved terminal actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalog {
    specs: Vec<ActionSpec>,
}

impl ActionCatalog {
    pub fn new(specific: Vec<ActionSpec>) -> Result<Self, WorkerError> {
        let mut seen = HashSet::new();
        for spec in &specific {
            if spec.is_reserved() {
                return Err(WorkerError::ReservedName(spec.name.clone()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(WorkerError::DuplicateAction(spec.name.clone()));
            }
        }

        let mut specs = specific;
        specs.push(ActionSpec::finish());
        specs.push(ActionSpec::give_up());
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[ActionSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name == name)
    }

    pub fn function_schemas(&self) -> Vec<Value> {
        self.specs.iter().map(ActionSpec::to_function_schema).collect()
    }
}

/// Name, instructions, action catalog, step limit and kill switch of a worker.
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    name: String,
    instructions: String,
    catalog: ActionCatalog,
    step_limit: u32,
    cancellation: CancellationSignal,
}

impl WorkerIdentity {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        actions: Vec<ActionSpec>,
        step_limit: u32,
    ) -> Result<Self, WorkerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkerError::EmptyName);
        }
        if step_limit == 0 {
            return Err(WorkerError::InvalidStepLimit);
        }

        Ok(Self {
            name,
            instructions: instructions.into(),
            catalog: ActionCatalog::new(actions)?,
            step_limit,
            cancellation: CancellationSignal::new(),
        })
    }

    /// Attach a kill switch shared with the orchestrator.
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancellation = signal;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn step_limit(&self) -> u32 {
        self.step_limit
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }
}

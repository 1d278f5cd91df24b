//! Conversation and action data model shared by the round driver and its collaborators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured input of an action request: a JSON object.
pub type ActionInput = Map<String, Value>;

/// An action the model asked the worker to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Correlation id, echoed back on the matching [`ActionOutcome`].
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: ActionInput,
}

impl ActionRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: ActionInput) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Read a string field from the input, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }
}

/// Text produced for an action request: either its result or a failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum OutcomeBody {
    Text(String),
    Error(String),
}

/// Result fed back to the model for exactly one [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub id: String,
    pub body: OutcomeBody,
}

impl ActionOutcome {
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: OutcomeBody::Text(text.into()),
        }
    }

    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: OutcomeBody::Error(text.into()),
        }
    }

    pub fn content(&self) -> &str {
        match &self.body {
            OutcomeBody::Text(text) | OutcomeBody::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, OutcomeBody::Error(_))
    }
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        content: String,
    },
    Model {
        narration: String,
        requests: Vec<ActionRequest>,
    },
    ToolResult {
        name: String,
        outcome: ActionOutcome,
    },
}

/// Ordered, append-only conversation state for one run.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::User {
            content: content.into(),
        });
    }

    pub fn push_model(&mut self, narration: impl Into<String>, requests: Vec<ActionRequest>) {
        self.turns.push(Turn::Model {
            narration: narration.into(),
            requests,
        });
    }

    pub fn push_outcome(&mut self, name: impl Into<String>, outcome: ActionOutcome) {
        self.turns.push(Turn::ToolResult {
            name: name.into(),
            outcome,
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// All action outcomes recorded so far, in order.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &ActionOutcome)> {
        self.turns.iter().filter_map(|turn| match turn {
            Turn::ToolResult { name, outcome } => Some((name.as_str(), outcome)),
            _ => None,
        })
    }

    /// Text of every user turn, including synthetic instructions.
    pub fn user_messages(&self) -> impl Iterator<Item = &str> {
        self.turns.iter().filter_map(|turn| match turn {
            Turn::User { content } => Some(content.as_str()),
            _ => None,
        })
    }
}

/// What the model returned for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub narration: String,
    /// Requested actions, in the order the model returned them.
    pub requests: Vec<ActionRequest>,
    /// `false` once the model has declared it is done talking for this turn.
    pub more_to_say: bool,
}

impl ModelReply {
    /// A reply with narration only, ending the model's turn.
    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            narration: text.into(),
            requests: Vec::new(),
            more_to_say: false,
        }
    }

    pub fn with_requests(requests: Vec<ActionRequest>) -> Self {
        Self {
            narration: String::new(),
            requests,
            more_to_say: false,
        }
    }
}

//! Seams between the round driver and its external collaborators.

use crate::types::{ActionInput, ModelReply, Transcript};
use crate::worker::ActionCatalog;
use async_trait::async_trait;
use thiserror::Error;

/// How the retry wrapper treats a model error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Fatal,
}

/// Classified failure of a model invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected a tool call the model produced.
    #[error("Malformed tool call: {0}")]
    MalformedToolCall(String),

    #[error("Model error: {0}")]
    Fatal(String),
}

impl ModelError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ModelError::RateLimited(_) | ModelError::MalformedToolCall(_) => ErrorClass::Transient,
            ModelError::Fatal(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Failure raised by an action dispatcher.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Language model that decides the next step.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(
        &self,
        instructions: &str,
        transcript: &Transcript,
        catalog: &ActionCatalog,
    ) -> Result<ModelReply, ModelError>;

    /// Label used in logs.
    fn name(&self) -> &str {
        "model"
    }
}

/// Performs the side effect behind an action name.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, name: &str, input: &ActionInput) -> Result<String, ActionError>;
}

/// One-way channel for human-visible status. Implementations swallow their own failures.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Notifier that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

#[async_trait]
impl ProgressNotifier for SilentNotifier {
    async fn notify(&self, _text: &str) {}
}

/// Telemetry hooks invoked synchronously by the driver. None affect control flow.
pub trait RunObserver: Send + Sync {
    fn on_start(&self, _task: &str) {}

    /// Called after every dispatched action with the text placed in the transcript.
    fn on_action(&self, _round: u32, _name: &str, _result: &str) {}

    fn on_finish(&self, _summary: &str) {}

    fn on_give_up(&self, _reason: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

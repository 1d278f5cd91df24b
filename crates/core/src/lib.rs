//! TARS core: the tool-calling round driver shared by every worker.
//!
//! A worker is data (a [`WorkerIdentity`]) plus a [`ModelClient`] and an
//! [`ActionDispatcher`]. The [`RoundDriver`] runs it to exactly one [`RunOutcome`].

pub mod cancel;
pub mod dispatch;
pub mod driver;
pub mod gate;
pub mod interfaces;
pub mod metrics;
pub mod outcome;
pub mod retry;
pub mod types;
pub mod worker;
pub mod worker_config;

pub use cancel::CancellationSignal;
pub use dispatch::{guarded_dispatch, preview, truncate_chars, DEFAULT_MAX_RESULT_CHARS};
pub use driver::{ActionBudget, DriverOptions, RoundDriver};
pub use gate::{FinishGate, GateDecision, DEFAULT_VAGUE_PHRASES};
pub use interfaces::{
    ActionDispatcher, ActionError, ErrorClass, ModelClient, ModelError, NoopObserver,
    ProgressNotifier, RunObserver, SilentNotifier,
};
pub use outcome::{RunOutcome, TerminalState};
pub use retry::{invoke_with_retry, RetryPolicy};
pub use types::{ActionInput, ActionOutcome, ActionRequest, ModelReply, OutcomeBody, Transcript, Turn};
pub use worker::{
    is_reserved, ActionCatalog, ActionSpec, WorkerError, WorkerIdentity, DEFAULT_STEP_LIMIT, FINISH,
    GIVE_UP,
};
pub use worker_config::{load_worker_config, ConfigError, WorkerConfig};

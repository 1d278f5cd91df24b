use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tars_core::{preview, RunObserver, RunOutcome, TerminalState};
use tracing::{debug, info};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ESCALATE: i32 = 2;
pub const EXIT_KILLED: i32 = 130;

/// What `tars run` prints.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub worker: String,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub actions: usize,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        exit_code(self.outcome.state(), self.outcome.needs_escalation())
    }
}

pub fn exit_code(state: TerminalState, needs_escalation: bool) -> i32 {
    match state {
        TerminalState::Succeeded => EXIT_SUCCESS,
        TerminalState::Aborted => EXIT_KILLED,
        _ if needs_escalation => EXIT_ESCALATE,
        _ => EXIT_SUCCESS,
    }
}

/// Observer that logs executed actions and counts them for the report.
#[derive(Default)]
pub struct ActionCounter {
    actions: AtomicUsize,
}

impl ActionCounter {
    pub fn count(&self) -> usize {
        self.actions.load(Ordering::SeqCst)
    }
}

impl RunObserver for ActionCounter {
    fn on_start(&self, task: &str) {
        debug!("run started: {}", preview(task, 80));
    }

    fn on_action(&self, round: u32, name: &str, result: &str) {
        self.actions.fetch_add(1, Ordering::SeqCst);
        info!("round {} {} -> {}", round, name, preview(result, 120));
    }
}

//! The single value a run hands back to its caller.

use serde::Serialize;

/// Terminal states of the round driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Succeeded,
    Failed,
    Aborted,
    Exhausted,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::Succeeded => "succeeded",
            TerminalState::Failed => "failed",
            TerminalState::Aborted => "aborted",
            TerminalState::Exhausted => "exhausted",
        }
    }
}

/// Result of one run. Built once when the loop terminates; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    state: TerminalState,
    succeeded: bool,
    summary: String,
    rounds: u32,
    needs_escalation: bool,
    escalation_reason: Option<String>,
}

impl RunOutcome {
    pub(crate) fn success(summary: String, rounds: u32) -> Self {
        Self {
            state: TerminalState::Succeeded,
            succeeded: true,
            summary,
            rounds,
            needs_escalation: false,
            escalation_reason: None,
        }
    }

    pub(crate) fn gave_up(reason: String, rounds: u32) -> Self {
        Self {
            state: TerminalState::Failed,
            succeeded: false,
            summary: format!("Gave up: {}", reason),
            rounds,
            needs_escalation: true,
            escalation_reason: Some(reason),
        }
    }

    pub(crate) fn invocation_failed(error: String, rounds: u32) -> Self {
        Self {
            state: TerminalState::Failed,
            succeeded: false,
            summary: error.clone(),
            rounds,
            needs_escalation: true,
            escalation_reason: Some(error),
        }
    }

    pub(crate) fn exhausted(reason: String, rounds: u32) -> Self {
        Self {
            state: TerminalState::Exhausted,
            succeeded: false,
            summary: reason.clone(),
            rounds,
            needs_escalation: true,
            escalation_reason: Some(reason),
        }
    }

    pub(crate) fn aborted(summary: String, rounds: u32) -> Self {
        Self {
            state: TerminalState::Aborted,
            succeeded: false,
            summary,
            rounds,
            needs_escalation: false,
            escalation_reason: None,
        }
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Summary on success, error description otherwise.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Rounds in which the model was invoked.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn needs_escalation(&self) -> bool {
        self.needs_escalation
    }

    pub fn escalation_reason(&self) -> Option<&str> {
        self.escalation_reason.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_escalation() {
        let outcome = RunOutcome::success("Wrote report.csv".to_string(), 4);
        assert!(outcome.succeeded());
        assert!(!outcome.needs_escalation());
        assert_eq!(outcome.escalation_reason(), None);
        assert_eq!(outcome.state(), TerminalState::Succeeded);
        assert_eq!(outcome.rounds(), 4);
    }

    #[test]
    fn test_failures_escalate_but_abort_does_not() {
        let gave_up = RunOutcome::gave_up("no network".to_string(), 2);
        assert!(gave_up.needs_escalation());
        assert_eq!(gave_up.escalation_reason(), Some("no network"));
        assert_eq!(gave_up.summary(), "Gave up: no network");

        let exhausted = RunOutcome::exhausted("Step limit (3) reached".to_string(), 3);
        assert_eq!(exhausted.state(), TerminalState::Exhausted);
        assert!(exhausted.needs_escalation());

        let aborted = RunOutcome::aborted("killed".to_string(), 0);
        assert!(!aborted.succeeded());
        assert!(!aborted.needs_escalation());
        assert_eq!(aborted.escalation_reason(), None);
        assert_eq!(aborted.summary(), "killed");
    }

    #[test]
    fn test_outcome_serializes_state() {
        let outcome = RunOutcome::invocation_failed("Model error: quota".to_string(), 1);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["needs_escalation"], true);
        assert_eq!(value["rounds"], 1);
    }
}

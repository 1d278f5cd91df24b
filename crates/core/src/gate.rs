//! Premature-completion gate applied to every `finish` request.

use serde::{Deserialize, Serialize};

/// Phrases that say nothing about what was actually done.
pub const DEFAULT_VAGUE_PHRASES: &[&str] = &["done", "completed", "task completed", "task is complete"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    /// Do not terminate; feed `corrective` back to the model.
    Reject { corrective: String },
}

/// Rejects `finish` when too few actions ran *and* the summary is vague.
///
/// The phrase list is a heuristic, not a classifier. It is configurable per worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishGate {
    /// Executed actions needed before a vague summary is accepted.
    pub min_actions: usize,
    /// Trimmed summaries shorter than this many characters count as vague.
    pub min_summary_len: usize,
    /// Compared case-insensitively, ignoring one trailing period.
    pub vague_phrases: Vec<String>,
}

impl Default for FinishGate {
    fn default() -> Self {
        Self {
            min_actions: 2,
            min_summary_len: 15,
            vague_phrases: DEFAULT_VAGUE_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl FinishGate {
    pub fn is_vague(&self, summary: &str) -> bool {
        let normalized = summary.trim().to_lowercase();
        if normalized.chars().count() < self.min_summary_len {
            return true;
        }

        let stem = without_period(&normalized);
        self.vague_phrases.iter().any(|phrase| {
            let phrase = phrase.trim().to_lowercase();
            without_period(phrase.as_str()) == stem
        })
    }

    pub fn evaluate(&self, executed_actions: usize, summary: &str) -> GateDecision {
        if executed_actions < self.min_actions && self.is_vague(summary) {
            return GateDecision::Reject {
                corrective: format!(
                    "REJECTED: you called finish without completing the task. Only {} action(s) \
                     have been executed so far. Use your actions to actually perform the task, \
                     then call finish again with a specific summary of what you did and how you \
                     verified it.",
                    executed_actions
                ),
            };
        }
        GateDecision::Accept
    }
}

fn without_period(text: &str) -> &str {
    text.strip_suffix('.').unwrap_or(text)
}

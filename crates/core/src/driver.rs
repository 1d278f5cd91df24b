//! Round driver - the control loop every worker runs on.

use crate::dispatch::{guarded_dispatch, preview, DEFAULT_MAX_RESULT_CHARS};
use crate::gate::{FinishGate, GateDecision};
use crate::interfaces::{
    ActionDispatcher, ModelClient, ModelError, NoopObserver, ProgressNotifier, RunObserver,
    SilentNotifier,
};
use crate::metrics;
use crate::outcome::RunOutcome;
use crate::retry::{invoke_with_retry, RetryPolicy};
use crate::types::{ActionOutcome, ModelReply, Transcript};
use crate::worker::{WorkerIdentity, FINISH, GIVE_UP};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const IDLE_NUDGE: &str = "You MUST use an action now. If the task is finished, call finish(summary) \
     with what you did. If it cannot be completed, call give-up(reason). Otherwise call your next action.";

const IDLE_NUDGE_INSISTENT: &str = "You have ended your turn several times without an action. \
     If the task is complete you MUST call the finish action with a specific summary. \
     If you are blocked, call give-up with the reason. Do not just end your turn.";

/// Soft and hard limits on executed actions per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionBudget {
    /// Reaching this injects a one-time wrap-up instruction.
    pub soft: usize,
    /// Reaching this ends the run as exhausted.
    pub hard: usize,
}

impl Default for ActionBudget {
    fn default() -> Self {
        Self { soft: 40, hard: 55 }
    }
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Progress cadence in rounds. `0` disables cadence notifications.
    pub notify_every: u32,
    pub max_result_chars: usize,
    pub retry: RetryPolicy,
    pub finish_gate: FinishGate,
    pub max_actions_per_round: Option<usize>,
    pub action_budget: Option<ActionBudget>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            notify_every: 3,
            max_result_chars: DEFAULT_MAX_RESULT_CHARS,
            retry: RetryPolicy::default(),
            finish_gate: FinishGate::default(),
            max_actions_per_round: Some(6),
            action_budget: Some(ActionBudget::default()),
        }
    }
}

enum Flow {
    Continue,
    Stop(RunOutcome),
}

/// Mutable state of one run, owned by the driver for its duration.
struct RunState {
    transcript: Transcript,
    executed: usize,
    last_action: Option<(String, String)>,
    on_fallback: bool,
    idle_streak: u32,
    budget_nudged: bool,
}

impl RunState {
    fn new(prompt: String) -> Self {
        let mut transcript = Transcript::new();
        transcript.push_user(prompt);
        Self {
            transcript,
            executed: 0,
            last_action: None,
            on_fallback: false,
            idle_streak: 0,
            budget_nudged: false,
        }
    }
}

/// Drives a worker through rounds of model invocation and action dispatch.
pub struct RoundDriver {
    worker: WorkerIdentity,
    model: Arc<dyn ModelClient>,
    fallback: Option<Arc<dyn ModelClient>>,
    dispatcher: Arc<dyn ActionDispatcher>,
    notifier: Arc<dyn ProgressNotifier>,
    observer: Arc<dyn RunObserver>,
    options: DriverOptions,
}

impl RoundDriver {
    pub fn new(
        worker: WorkerIdentity,
        model: Arc<dyn ModelClient>,
        dispatcher: Arc<dyn ActionDispatcher>,
    ) -> Self {
        Self {
            worker,
            model,
            fallback: None,
            dispatcher,
            notifier: Arc::new(SilentNotifier),
            observer: Arc::new(NoopObserver),
            options: DriverOptions::default(),
        }
    }

    /// Client used once the primary fails irrecoverably. Sticky for the rest of a run.
    pub fn with_fallback(mut self, fallback: Arc<dyn ModelClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ProgressNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn worker(&self) -> &WorkerIdentity {
        &self.worker
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Run `task` to a terminal state. Always yields exactly one outcome.
    pub async fn run(&self, task: &str, context: Option<&str>) -> RunOutcome {
        let outcome = self.drive(task, context).await;
        metrics::increment_runs(outcome.state());
        info!(
            "{} finished as {} after {} round(s)",
            self.worker.name(),
            outcome.state().as_str(),
            outcome.rounds()
        );
        outcome
    }

    async fn drive(&self, task: &str, context: Option<&str>) -> RunOutcome {
        let name = self.worker.name();
        info!("{} starting: {}", name, preview(task, 80));
        self.notifier
            .notify(&format!("{} starting: {}", name, preview(task, 300)))
            .await;
        self.observer.on_start(task);

        debug!(
            "[{}] actions: {}",
            name,
            self.worker.catalog().names().join(", ")
        );

        let mut state = RunState::new(task_prompt(task, context));
        let step_limit = self.worker.step_limit();

        for round in 1..=step_limit {
            if self.worker.cancellation().is_cancelled() {
                let summary = format!("{} killed by external signal before round {}", name, round);
                warn!("{}", summary);
                self.notifier.notify(&format!("{} killed", name)).await;
                return RunOutcome::aborted(summary, round - 1);
            }

            debug!("[{}] round {}/{}", name, round, step_limit);
            if let Flow::Stop(outcome) = self.play_round(round, &mut state).await {
                return outcome;
            }

            if self.options.notify_every > 0 && round % self.options.notify_every == 0 {
                if let Some((action, result)) = &state.last_action {
                    self.notifier
                        .notify(&format!(
                            "{} round {}: {}\n-> {}",
                            name,
                            round,
                            action,
                            preview(result, 200)
                        ))
                        .await;
                }
            }
        }

        let reason = format!(
            "Step limit ({}) reached without finish or give-up",
            step_limit
        );
        warn!("{}: {}", name, reason);
        self.notifier
            .notify(&format!("{} stopped: {}", name, reason))
            .await;
        RunOutcome::exhausted(reason, step_limit)
    }

    async fn play_round(&self, round: u32, state: &mut RunState) -> Flow {
        let name = self.worker.name();

        let reply = match self.invoke_model(&state.transcript, &mut state.on_fallback).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("{} model invocation failed: {}", name, err);
                self.notifier
                    .notify(&format!("{} model error: {}", name, preview(&err.to_string(), 200)))
                    .await;
                return Flow::Stop(RunOutcome::invocation_failed(
                    format!("Model invocation failed: {}", err),
                    round,
                ));
            }
        };

        let ModelReply {
            narration,
            requests,
            more_to_say,
        } = reply;

        if !narration.trim().is_empty() {
            debug!("[{}] narration: {}", name, preview(&narration, 200));
        }
        state.transcript.push_model(narration, requests.clone());

        if requests.is_empty() {
            if !more_to_say {
                self.nudge_idle(state);
            }
            return Flow::Continue;
        }
        state.idle_streak = 0;

        let mut dispatched_this_round = 0usize;
        for request in &requests {
            match request.name.as_str() {
                FINISH => {
                    let summary = request
                        .str_field("summary")
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .unwrap_or("Done.")
                        .to_string();

                    match self.options.finish_gate.evaluate(state.executed, &summary) {
                        GateDecision::Reject { corrective } => {
                            warn!(
                                "[{}] rejected premature finish ({} action(s) executed)",
                                name, state.executed
                            );
                            metrics::increment_finish_rejections();
                            state
                                .transcript
                                .push_outcome(FINISH, ActionOutcome::text(&request.id, corrective));
                        }
                        GateDecision::Accept => {
                            info!("[{}] finished: {}", name, preview(&summary, 200));
                            self.notifier
                                .notify(&format!("{} done: {}", name, preview(&summary, 500)))
                                .await;
                            self.observer.on_finish(&summary);
                            return Flow::Stop(RunOutcome::success(summary, round));
                        }
                    }
                }
                GIVE_UP => {
                    let reason = request
                        .str_field("reason")
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .unwrap_or("No reason given")
                        .to_string();

                    warn!("[{}] gave up: {}", name, preview(&reason, 200));
                    self.notifier
                        .notify(&format!("{} gave up: {}", name, preview(&reason, 500)))
                        .await;
                    self.observer.on_give_up(&reason);
                    return Flow::Stop(RunOutcome::gave_up(reason, round));
                }
                _ => {
                    if let Some(cap) = self.options.max_actions_per_round {
                        if dispatched_this_round >= cap {
                            debug!("[{}] skipping {}: per-round cap {} reached", name, request.name, cap);
                            state.transcript.push_outcome(
                                &request.name,
                                ActionOutcome::error(
                                    &request.id,
                                    format!(
                                        "SKIPPED: at most {} actions run per round. This call was not executed.",
                                        cap
                                    ),
                                ),
                            );
                            continue;
                        }
                    }

                    let outcome = guarded_dispatch(
                        self.dispatcher.as_ref(),
                        request,
                        self.options.max_result_chars,
                    )
                    .await;
                    state.executed += 1;
                    dispatched_this_round += 1;

                    self.observer.on_action(round, &request.name, outcome.content());
                    state.last_action =
                        Some((request.name.clone(), outcome.content().to_string()));
                    state.transcript.push_outcome(&request.name, outcome);
                }
            }
        }

        if let Some(budget) = self.options.action_budget {
            if state.executed >= budget.hard {
                let reason = format!("Action budget ({}) exhausted", budget.hard);
                warn!("{}: {}", name, reason);
                self.notifier
                    .notify(&format!("{} stopped: {}", name, reason))
                    .await;
                return Flow::Stop(RunOutcome::exhausted(reason, round));
            }
            if state.executed >= budget.soft && !state.budget_nudged {
                state.budget_nudged = true;
                warn!(
                    "[{}] action budget warning ({}/{})",
                    name, state.executed, budget.hard
                );
                state.transcript.push_user(format!(
                    "ACTION BUDGET: you have used {} of {} actions. Wrap up now: call finish with a \
                     detailed summary, or give-up if the task cannot be completed.",
                    state.executed, budget.hard
                ));
            }
        }

        Flow::Continue
    }

    fn nudge_idle(&self, state: &mut RunState) {
        state.idle_streak += 1;
        let text = if state.idle_streak >= 2 && state.executed > 0 {
            IDLE_NUDGE_INSISTENT
        } else {
            IDLE_NUDGE
        };
        state.transcript.push_user(text);
    }

    async fn invoke_model(
        &self,
        transcript: &Transcript,
        on_fallback: &mut bool,
    ) -> Result<ModelReply, ModelError> {
        let instructions = self.worker.instructions();
        let catalog = self.worker.catalog();
        let retry = &self.options.retry;

        let fallback = match (&self.fallback, *on_fallback) {
            (Some(fallback), true) => {
                return invoke_with_retry(fallback.as_ref(), retry, instructions, transcript, catalog)
                    .await
            }
            (fallback, _) => fallback,
        };

        let primary_err =
            match invoke_with_retry(self.model.as_ref(), retry, instructions, transcript, catalog)
                .await
            {
                Ok(reply) => return Ok(reply),
                Err(err) => err,
            };

        let Some(fallback) = fallback else {
            return Err(primary_err);
        };

        warn!(
            "{} failed ({}); trying fallback {}",
            self.model.name(),
            primary_err,
            fallback.name()
        );
        let reply =
            invoke_with_retry(fallback.as_ref(), retry, instructions, transcript, catalog).await?;
        info!(
            "[{}] switched to fallback model {} for the rest of the run",
            self.worker.name(),
            fallback.name()
        );
        *on_fallback = true;
        Ok(reply)
    }
}

fn task_prompt(task: &str, context: Option<&str>) -> String {
    let mut content = format!("Complete this task:\n\n{}", task.trim());
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        content.push_str("\n\n## Additional Context\n");
        content.push_str(context);
    }
    content
}

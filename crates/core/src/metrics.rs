//! Metrics instrumentation for run observability.

use crate::outcome::TerminalState;
use std::time::Instant;

pub const MODEL_INVOCATION_LATENCY: &str = "tars_model_invocation_latency";
pub const ACTION_LATENCY: &str = "tars_action_latency";

/// Record model invocation latency.
pub fn record_model_latency(duration_ms: f64) {
    metrics::histogram!("tars_model_invocation_latency", duration_ms);
}

/// Record action dispatch latency.
pub fn record_action_latency(duration_ms: f64) {
    metrics::histogram!("tars_action_latency", duration_ms);
}

pub fn increment_model_retries() {
    metrics::counter!("tars_model_retries", 1);
}

pub fn increment_action_failures(action: &str) {
    metrics::counter!("tars_action_failures", 1, "action" => action.to_string());
}

pub fn increment_finish_rejections() {
    metrics::counter!("tars_finish_rejections", 1);
}

pub fn increment_runs(state: TerminalState) {
    metrics::counter!("tars_runs", 1, "state" => state.as_str());
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.metric_name {
            MODEL_INVOCATION_LATENCY => record_model_latency(duration_ms),
            ACTION_LATENCY => record_action_latency(duration_ms),
            _ => {}
        }
    }
}

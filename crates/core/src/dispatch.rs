//! Error containment around a single action dispatch.

use crate::interfaces::ActionDispatcher;
use crate::metrics::{self, MetricTimer};
use crate::types::{ActionOutcome, ActionRequest};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RESULT_CHARS: usize = 8000;

/// Dispatch `request` and turn whatever happens into an [`ActionOutcome`].
///
/// Errors and panics become error outcomes. Successful results are cut to
/// `max_chars` characters.
pub async fn guarded_dispatch(
    dispatcher: &dyn ActionDispatcher,
    request: &ActionRequest,
    max_chars: usize,
) -> ActionOutcome {
    debug!(
        "dispatching {}({})",
        request.name,
        preview(&serde_json::Value::Object(request.input.clone()).to_string(), 120)
    );

    let result = {
        let _timer = MetricTimer::new(metrics::ACTION_LATENCY);
        AssertUnwindSafe(dispatcher.dispatch(&request.name, &request.input))
            .catch_unwind()
            .await
    };

    match result {
        Ok(Ok(text)) => {
            debug!("{} -> {}", request.name, preview(&text, 200));
            ActionOutcome::text(&request.id, truncate_chars(&text, max_chars))
        }
        Ok(Err(err)) => {
            warn!("Action {} failed: {}", request.name, err);
            metrics::increment_action_failures(&request.name);
            ActionOutcome::error(
                &request.id,
                format!("ERROR: action '{}' failed: {}", request.name, err),
            )
        }
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            warn!("Action {} panicked: {}", request.name, detail);
            metrics::increment_action_failures(&request.name);
            ActionOutcome::error(
                &request.id,
                format!("ERROR: action '{}' crashed: {}", request.name, detail),
            )
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Short single-purpose preview for logs and notifications.
pub fn preview(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::interfaces::ActionError;
    use crate::types::ActionInput;
    use async_trait::async_trait;

    struct Fixed(Result<String, String>);

    #[async_trait]
    impl ActionDispatcher for Fixed {
        async fn dispatch(&self, _name: &str, _input: &ActionInput) -> Result<String, ActionError> {
            self.0.clone().map_err(ActionError::Execution)
        }
    }

    struct Exploding;

    #[async_trait]
    impl ActionDispatcher for Exploding {
        async fn dispatch(&self, _name: &str, _input: &ActionInput) -> Result<String, ActionError> {
            panic!("disk on fire")
        }
    }

    fn request() -> ActionRequest {
        ActionRequest::new("call_7", "write_file", ActionInput::new())
    }

    #[tokio::test]
    async fn test_success_keeps_correlation_id() {
        let outcome = guarded_dispatch(&Fixed(Ok("wrote 3 bytes".to_string())), &request(), 100).await;
        assert_eq!(outcome, ActionOutcome::text("call_7", "wrote 3 bytes"));
    }

    #[tokio::test]
    async fn test_error_becomes_text_outcome() {
        let outcome = guarded_dispatch(&Fixed(Err("no space left".to_string())), &request(), 100).await;
        assert!(outcome.is_error());
        assert_eq!(outcome.id, "call_7");
        assert!(outcome.content().contains("write_file"));
        assert!(outcome.content().contains("no space left"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let outcome = guarded_dispatch(&Exploding, &request(), 100).await;
        assert!(outcome.is_error());
        assert!(outcome.content().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_long_results_are_truncated() {
        let long = "x".repeat(DEFAULT_MAX_RESULT_CHARS + 500);
        let outcome = guarded_dispatch(&Fixed(Ok(long)), &request(), DEFAULT_MAX_RESULT_CHARS).await;
        assert_eq!(outcome.content().chars().count(), DEFAULT_MAX_RESULT_CHARS);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_preview_marks_cut_text() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }
}

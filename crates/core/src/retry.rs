//! Model invocation with linear-backoff retry of transient errors.

use crate::interfaces::{ModelClient, ModelError};
use crate::metrics::{self, MetricTimer};
use crate::types::{ModelReply, Transcript};
use crate::worker::ActionCatalog;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts per client and the base of the linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Invoke `client`, retrying only transient errors.
///
/// Fatal errors are returned after the first attempt. Transient errors are
/// returned once `max_attempts` is used up.
pub async fn invoke_with_retry(
    client: &dyn ModelClient,
    policy: &RetryPolicy,
    instructions: &str,
    transcript: &Transcript,
    catalog: &ActionCatalog,
) -> Result<ModelReply, ModelError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        debug!("{} invocation attempt {}/{}", client.name(), attempt, attempts);

        let result = {
            let _timer = MetricTimer::new(metrics::MODEL_INVOCATION_LATENCY);
            client.invoke(instructions, transcript, catalog).await
        };

        match result {
            Ok(reply) => return Ok(reply),
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} invocation failed (attempt {}/{}): {}. Retrying in {:?}",
                    client.name(),
                    attempt,
                    attempts,
                    err,
                    delay
                );
                metrics::increment_model_retries();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    "{} invocation failed after {} attempt(s): {}",
                    client.name(),
                    attempt,
                    err
                );
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Flaky {
        script: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
        calls: Mutex<u32>,
    }

    impl Flaky {
        fn new(script: Vec<Result<ModelReply, ModelError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ModelClient for Flaky {
        async fn invoke(
            &self,
            _instructions: &str,
            _transcript: &Transcript,
            _catalog: &ActionCatalog,
        ) -> Result<ModelReply, ModelError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::Fatal("script exhausted".to_string())))
        }
    }

    fn catalog() -> ActionCatalog {
        ActionCatalog::new(vec![]).unwrap()
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let client = Flaky::new(vec![
            Err(ModelError::RateLimited("429".to_string())),
            Err(ModelError::MalformedToolCall("tool_use_failed".to_string())),
            Ok(ModelReply::narration("ok")),
        ]);

        let started = tokio::time::Instant::now();
        let reply = invoke_with_retry(&client, &RetryPolicy::default(), "", &Transcript::new(), &catalog())
            .await
            .unwrap();

        assert_eq!(reply.narration, "ok");
        assert_eq!(client.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_exhaust_after_three_attempts() {
        let client = Flaky::new(vec![
            Err(ModelError::RateLimited("1".to_string())),
            Err(ModelError::RateLimited("2".to_string())),
            Err(ModelError::RateLimited("3".to_string())),
            Ok(ModelReply::narration("never reached")),
        ]);

        let err = invoke_with_retry(&client, &RetryPolicy::default(), "", &Transcript::new(), &catalog())
            .await
            .unwrap_err();

        assert_eq!(err, ModelError::RateLimited("3".to_string()));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let client = Flaky::new(vec![
            Err(ModelError::Fatal("invalid api key".to_string())),
            Ok(ModelReply::narration("never reached")),
        ]);

        let started = tokio::time::Instant::now();
        let err = invoke_with_retry(&client, &RetryPolicy::default(), "", &Transcript::new(), &catalog())
            .await
            .unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(client.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_invokes_once() {
        let client = Flaky::new(vec![Ok(ModelReply::narration("once"))]);
        let policy = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::ZERO,
        };

        invoke_with_retry(&client, &policy, "", &Transcript::new(), &catalog())
            .await
            .unwrap();
        assert_eq!(client.calls(), 1);
    }
}

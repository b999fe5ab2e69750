//! The language-model capability: one completion per call, bounded by a
//! per-attempt timeout and a small retry budget.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use ordermate_core::config::LlmConfig;
use ordermate_core::errors::ApplicationError;

use crate::conversation::Turn;
use crate::tools::{OrderCommand, ToolDefinition};

const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system: String,
    /// Prior turns followed by the current user utterance.
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn latest_user_text(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == crate::conversation::Role::User)
            .map(|turn| turn.text.as_str())
            .unwrap_or_default()
    }
}

/// What the model chose to do with the turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Text(String),
    Command(OrderCommand),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    /// Not worth retrying, e.g. bad credentials or an undecodable tool call.
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LlmError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

#[async_trait]
impl LlmClient for Arc<dyn LlmClient> {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        (**self).complete(request).await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Applies [`RetryPolicy`] around any client and reports exhaustion as an
/// upstream application failure.
pub struct RetryingLlmClient<C = Arc<dyn LlmClient>> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: LlmClient> RetryingLlmClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApplicationError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.inner.complete(request),
            )
            .await
            {
                Ok(Ok(completion)) => {
                    debug!(event_name = "llm.completion.succeeded", attempt, "llm completion succeeded");
                    return Ok(completion);
                }
                Ok(Err(error)) => error,
                Err(_) => LlmError::Timeout,
            };

            warn!(
                event_name = "llm.completion.failed",
                attempt,
                max_attempts,
                error = %error,
                "llm completion attempt failed"
            );

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(match error {
                    LlmError::Timeout => ApplicationError::UpstreamTimeout { attempts: attempt },
                    other => ApplicationError::UpstreamFailure(other.to_string()),
                });
            }
            tokio::time::sleep(self.policy.backoff(attempt)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use ordermate_core::errors::ApplicationError;

    use super::{
        Completion, CompletionRequest, LlmClient, LlmError, RetryPolicy, RetryingLlmClient,
    };
    use crate::conversation::Turn;

    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<Completion, LlmError>>>,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<Completion, LlmError>>) -> Self {
            Self { replies: Mutex::new(replies.into()), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().expect("lock").pop_front();
            next.unwrap_or_else(|| Err(LlmError::Response("script exhausted".to_string())))
        }
    }

    struct HangingClient {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for HangingClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Completion::Text("too late".to_string()))
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_secs(5),
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system".to_string(),
            turns: vec![Turn::user("hello")],
            tools: Vec::new(),
        }
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
        assert_eq!(policy.max_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let client = RetryingLlmClient::new(
            ScriptedClient::new(vec![
                Err(LlmError::Http("connection reset".to_string())),
                Ok(Completion::Text("hi".to_string())),
            ]),
            policy(),
        );

        let completion = client.complete(&request()).await.expect("second attempt succeeds");

        assert_eq!(completion, Completion::Text("hi".to_string()));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_model_surfaces_typed_timeout_after_bounded_attempts() {
        let client = RetryingLlmClient::new(HangingClient { calls: AtomicU32::new(0) }, policy());
        let started = tokio::time::Instant::now();

        let error = client.complete(&request()).await.expect_err("never answers");

        assert_eq!(error, ApplicationError::UpstreamTimeout { attempts: 3 });
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
        // three timeouts plus 100ms and 200ms of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(15_300), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(16), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_request_is_not_retried() {
        let client = RetryingLlmClient::new(
            ScriptedClient::new(vec![Err(LlmError::Rejected("HTTP 401".to_string()))]),
            policy(),
        );

        let error = client.complete(&request()).await.expect_err("rejected");

        assert!(matches!(error, ApplicationError::UpstreamFailure(message) if message.contains("401")));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_errors_become_upstream_failure() {
        let client = RetryingLlmClient::new(ScriptedClient::new(Vec::new()), policy());

        let error = client.complete(&request()).await.expect_err("exhausted");

        assert!(matches!(error, ApplicationError::UpstreamFailure(_)));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn latest_user_text_skips_trailing_assistant_turns() {
        let request = CompletionRequest {
            system: String::new(),
            turns: vec![Turn::user("first"), Turn::assistant("reply")],
            tools: Vec::new(),
        };
        assert_eq!(request.latest_user_text(), "first");
    }
}

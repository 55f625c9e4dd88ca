//! Bounded retry around a single model call.
//!
//! Retries repeat the *same* request; they never add conversation rounds, so
//! the caller's limit on logical model calls is unaffected.

use crate::client::LlmClient;
use crate::message::{ChatRequest, ChatResponse};
use coursemate_core::AppResult;
use std::sync::Arc;
use std::time::Duration;

/// Retry limits for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,

    /// Sleep before the first retry; doubles for each further retry
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn backoff_for(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(retry.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(250))
    }
}

/// Client decorator that retries transient failures with exponential backoff.
///
/// Requests the endpoint rejected outright (4xx other than 408/429) fail
/// immediately.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait::async_trait]
impl LlmClient for RetryingClient {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let mut retry = 0;
        loop {
            match self.inner.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && retry < self.policy.max_retries => {
                    retry += 1;
                    let backoff = self.policy.backoff_for(retry);
                    tracing::warn!(
                        "Model call failed (retry {}/{} in {:?}): {}",
                        retry,
                        self.policy.max_retries,
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

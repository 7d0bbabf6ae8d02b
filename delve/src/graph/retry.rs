//! Retry and deadline handling for collaborator calls.
//!
//! Every LLM, retrieval, search and embedding batch goes through
//! [`CallPolicy::call`]: each attempt gets its own `tokio::time::timeout`, and
//! transient failures are retried with capped exponential backoff.

use std::future::Future;
use std::time::Duration;

use crate::corpus::CorpusError;
use crate::error::AgentError;

/// Default per-call deadline.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// How many times to retry and how long to wait in between.
///
/// The wait before retry `n` (0-based) is `initial_interval * multiplier^n`,
/// capped at `max_interval`. A multiplier of 1.0 gives a fixed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    pub fn fixed(max_retries: usize, interval: Duration) -> Self {
        Self::exponential(max_retries, interval, interval, 1.0)
    }

    pub fn exponential(
        max_retries: usize,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// Backoff used by research runs: `retries` retries, 500ms doubling up to 5s.
    pub fn research_default(retries: usize) -> Self {
        Self::exponential(
            retries,
            Duration::from_millis(500),
            Duration::from_secs(5),
            2.0,
        )
    }

    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_retries
    }

    pub fn delay(&self, attempt: usize) -> Duration {
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs).min(self.max_interval)
    }
}

/// Errors [`CallPolicy::call`] knows how to classify and how to build on timeout.
pub trait RetryableError: std::fmt::Display {
    fn is_transient(&self) -> bool;

    fn timed_out(operation: &str, after: Duration) -> Self;
}

impl RetryableError for AgentError {
    fn is_transient(&self) -> bool {
        AgentError::is_transient(self)
    }

    fn timed_out(operation: &str, after: Duration) -> Self {
        AgentError::Timeout {
            operation: operation.to_string(),
            after,
        }
    }
}

impl RetryableError for CorpusError {
    fn is_transient(&self) -> bool {
        CorpusError::is_transient(self)
    }

    fn timed_out(operation: &str, after: Duration) -> Self {
        CorpusError::Embedding(format!("{} timed out after {:?}", operation, after))
    }
}

/// Deadline plus retry budget applied to one kind of collaborator call.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::research_default(2),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl CallPolicy {
    pub fn new(retry: RetryPolicy, timeout: Duration) -> Self {
        Self { retry, timeout }
    }

    /// Runs `call` until it succeeds, fails with a non-transient error, or the
    /// retry budget is spent. The last error is returned.
    pub async fn call<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        E: RetryableError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(operation, self.timeout)),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        ?delay,
                        error = %e,
                        "call failed, retrying"
                    );
                    if delay > Duration::ZERO {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

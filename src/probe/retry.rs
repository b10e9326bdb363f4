//! Bounded retry for transient fetch failures
//!
//! | Failure | Action |
//! |---------|--------|
//! | Timeout | Retry up to `max_retries` times, exponential backoff |
//! | Network | Retry up to `max_retries` times, exponential backoff |
//! | HTTP status | Immediate, never retried |
//! | Unknown | Immediate, never retried |

use crate::config::PipelineConfig;
use crate::probe::{FetchFailure, PageFetcher};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How many extra attempts a fetch unit gets, and how long it waits between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Fetches `url`, retrying retryable failures according to `policy`
///
/// Cancellation cuts a pending backoff short and returns the last failure.
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<String, FetchFailure> {
    let mut attempt = 0;

    loop {
        match fetcher.fetch(url).await {
            Ok(body) => return Ok(body),
            Err(failure) if failure.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Retrying {} in {:?} (attempt {}/{}): {}",
                    url,
                    delay,
                    attempt,
                    policy.max_retries,
                    failure
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(failure),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(failure) => return Err(failure),
        }
    }
}

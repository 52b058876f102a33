//! Bounded retry with exponential backoff and jitter for model calls.
//!
//! Every model call in the crate goes through [`invoke_with_retries`]. Each
//! attempt is time-boxed; a failed attempt sleeps
//! `backoff * 2^attempt + uniform(0, jitter)` before the next one, and the
//! last attempt's error is returned unchanged.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::AgentError;

/// Retry settings shared by every model role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub backoff: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_retries: u32, backoff: Duration, jitter: Duration) -> Self {
        Self {
            max_retries,
            backoff,
            jitter,
        }
    }

    /// A single attempt with no retries.
    #[must_use]
    pub const fn no_retries() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt + 1`, without jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Sum of the jitter-free delays across a fully exhausted run.
    #[must_use]
    pub fn min_total_backoff(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.base_delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.base_delay(attempt).saturating_add(jitter)
    }
}

/// Runs `call` until it succeeds or `policy.max_retries + 1` attempts have
/// failed.
///
/// Each attempt is bounded by `timeout`; an attempt that overruns counts as
/// [`AgentError::Timeout`].
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn invoke_with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    mut call: F,
) -> Result<T, AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let mut attempt = 0;
    loop {
        let error = match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => AgentError::Timeout { timeout },
        };

        if attempt >= policy.max_retries {
            return Err(error);
        }

        let delay = policy.delay(attempt);
        warn!(
            attempt = attempt + 1,
            max_attempts = policy.max_retries + 1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "model call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn failing(attempt: u32) -> AgentError {
        AgentError::ApiRequest {
            message: format!("attempt {attempt}"),
            status: Some(503),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::ZERO);

        let result = invoke_with_retries(&policy, Duration::from_secs(1), || async {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 { Err(failing(n)) } else { Ok(n) }
        })
        .await;

        assert_eq!(result.ok(), Some(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error_after_all_attempts() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(5));
        let started = Instant::now();

        let result: Result<(), AgentError> =
            invoke_with_retries(&policy, Duration::from_secs(1), || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                Err(failing(n))
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        match result {
            Err(AgentError::ApiRequest { message, status }) => {
                assert_eq!(message, "attempt 4");
                assert_eq!(status, Some(503));
            }
            other => unreachable!("expected last upstream error, got {other:?}"),
        }
        // 10 + 20 + 40 ms before jitter.
        assert!(started.elapsed() >= policy.min_total_backoff());
        assert_eq!(policy.min_total_backoff(), Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_each_attempt_is_time_boxed() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Duration::from_millis(1), Duration::ZERO);
        let timeout = Duration::from_millis(5);

        let result: Result<(), AgentError> = invoke_with_retries(&policy, timeout, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(AgentError::Timeout { timeout: t }) if t == timeout));
    }

    #[tokio::test]
    async fn test_no_retries_means_single_attempt() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), AgentError> =
            invoke_with_retries(&RetryPolicy::no_retries(), Duration::from_secs(1), || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AgentError::ApiKeyMissing)
            })
            .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_base_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay(0), Duration::from_millis(500));
        assert_eq!(policy.base_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.base_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.min_total_backoff(), Duration::from_millis(1500));
    }

    #[test]
    fn test_delay_stays_within_jitter_bound() {
        let policy = RetryPolicy::new(2, Duration::from_millis(100), Duration::from_millis(50));
        for _ in 0..50 {
            let d = policy.delay(1);
            assert!(d >= Duration::from_millis(200));
            assert!(d <= Duration::from_millis(250));
        }
    }
}

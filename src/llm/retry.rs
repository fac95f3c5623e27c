//! Exponential backoff for rate-limited upstream calls.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// How many times to try, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub base_delay: Duration,
    /// Factor applied to the wait after every further attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and initial delay, doubling each time.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: 2,
        }
    }

    /// Delay slept after the failed attempt numbered `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor)
    }
}

/// Source of delays, injectable so tests can observe backoff without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Classification of a failed attempt.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Transient rate limiting; worth retrying after a delay.
    RateLimited(E),
    /// Anything else; returned immediately.
    Fatal(E),
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt was rate limited.
    Exhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// Error of the final attempt.
        last: E,
    },
    /// A non-retryable failure occurred.
    Fatal(E),
}

/// Run `operation` until it succeeds, fails fatally, or the policy's attempts are used up.
///
/// No delay follows the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(error)) => return Err(RetryError::Fatal(error)),
            Err(AttemptError::RateLimited(error)) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                let wait = policy.delay_after(attempt);
                tracing::warn!(attempt, wait_ms = wait.as_millis() as u64, "Rate limited; backing off");
                sleeper.sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sleeper that records requested delays and returns immediately.
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub(crate) delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub(crate) fn recorded(&self) -> Vec<Duration> {
            self.delays.lock().expect("delays lock").clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().expect("delays lock").push(duration);
        }
    }

    #[test]
    fn default_policy_doubles_from_two_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=4).map(|a| policy.delay_after(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16]);
    }

    #[tokio::test]
    async fn retries_rate_limits_until_success() {
        let sleeper = RecordingSleeper::default();
        let result: Result<&str, RetryError<&str>> =
            retry_with_backoff(&RetryPolicy::default(), &sleeper, |attempt| async move {
                if attempt < 3 {
                    Err(AttemptError::RateLimited("429"))
                } else {
                    Ok("answer")
                }
            })
            .await;

        assert_eq!(result.ok(), Some("answer"));
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Result<(), RetryError<&str>> =
            retry_with_backoff(&RetryPolicy::default(), &sleeper, |_| {
                calls += 1;
                async { Err(AttemptError::RateLimited("429")) }
            })
            .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 5, .. })
        ));
        assert_eq!(calls, 5);
        assert_eq!(sleeper.recorded().len(), 4);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Result<(), RetryError<&str>> =
            retry_with_backoff(&RetryPolicy::default(), &sleeper, |_| {
                calls += 1;
                async { Err(AttemptError::Fatal("500")) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Fatal("500"))));
        assert_eq!(calls, 1);
        assert!(sleeper.recorded().is_empty());
    }
}

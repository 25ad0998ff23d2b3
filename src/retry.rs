//! Retry-with-backoff shared by every retry site in the pipeline.
//!
//! The caller supplies the number of attempts and a classifier that decides,
//! per error, whether to give up or which backoff to wait before the next
//! attempt. The operation receives the zero-based attempt index, which lets
//! callers rotate through alternatives (the model fallback list does this).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// `step * n` after the n-th failure.
    Linear(Duration),
    /// `base * 2^(n-1)` after the n-th failure, never above `cap`.
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    /// Delay to wait after `failures` failed attempts (1-based).
    pub fn delay(&self, failures: u32) -> Duration {
        let failures = failures.max(1);
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step.saturating_mul(failures),
            Backoff::Exponential { base, cap } => {
                let factor = 2u32.saturating_pow(failures - 1);
                base.saturating_mul(factor).min(cap)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Abort,
    Retry(Backoff),
}

pub async fn retry<T, E, Op, Fut, Classify>(
    max_attempts: u32,
    classify: Classify,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Classify: Fn(&E) -> RetryAction,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut failures = 0;

    loop {
        let err = match op(failures).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        failures += 1;

        if failures >= max_attempts {
            return Err(err);
        }

        match classify(&err) {
            RetryAction::Abort => return Err(err),
            RetryAction::Retry(backoff) => {
                let delay = backoff.delay(failures);
                tracing::debug!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    failures,
                    max_attempts,
                    err,
                    delay
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_exponential_schedule_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(120),
        };
        let delays: Vec<u64> = (1..=6).map(|n| backoff.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 120]);
    }

    #[test]
    fn test_linear_schedule() {
        let backoff = Backoff::Linear(Duration::from_secs(1));
        let delays: Vec<u64> = (1..=3).map(|n| backoff.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 3]);
        assert_eq!(Backoff::Fixed(Duration::from_secs(2)).delay(4), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry(
            5,
            |_| RetryAction::Retry(Backoff::None),
            |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 2 {
                        Err(format!("failure {}", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry(
            3,
            |_| RetryAction::Retry(Backoff::None),
            |_| {
                calls.set(calls.get() + 1);
                async { Err("always".to_string()) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_aborts_on_fatal_error() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry(
            5,
            |err: &String| {
                if err == "fatal" {
                    RetryAction::Abort
                } else {
                    RetryAction::Retry(Backoff::None)
                }
            },
            |_| {
                calls.set(calls.get() + 1);
                async { Err("fatal".to_string()) }
            },
        )
        .await;

        assert_eq!(result, Err("fatal".to_string()));
        assert_eq!(calls.get(), 1);
    }
}

//! Bounded retry with exponential backoff for transient venue faults.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::Result;

/// Retry parameters for one REST call site.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Backoff between attempt `n` and `n + 1` is `backoff_base^n` seconds.
    pub backoff_base: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after zero-indexed `attempt` failed.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(u64::from(self.backoff_base).pow(attempt))
    }
}

/// Run `op` until it succeeds, fails non-transiently, or exhausts the
/// policy. Only [`Transient`](crate::ExchangeError::Transient) errors are
/// retried; anything else short-circuits to the caller, as does the last
/// transient error once attempts run out.
pub async fn with_retry<T, F, Fut>(name: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation = name,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    error!(
                        operation = name,
                        attempts = policy.max_attempts,
                        error = %e,
                        "Retries exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExchangeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> ExchangeError {
        ExchangeError::Transient {
            message: "server busy".into(),
            code: -1001,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry("op", RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_transient_after_exhaustion() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("op", RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("op", RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ExchangeError::InvalidOrder("price required".into())) }
        })
        .await;
        assert!(matches!(result, Err(ExchangeError::InvalidOrder(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_is_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }
}

//! Bounded retry for backend calls: per-attempt timeout and exponential backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::BackendError;
use crate::cancel::CancellationHandle;

/// Retry configuration for one mutation slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries (0 = no retries, run once).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
    /// Maximum wall-clock time for a single attempt (milliseconds).
    pub request_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
            request_timeout_ms: 120_000,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(2u64.saturating_pow(attempt - 1)))
    }
}

/// Every attempt failed; the slot is skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("backend failed after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: BackendError,
}

/// Run `call` until it succeeds, a non-retryable error occurs, retries run
/// out, or `cancel` fires. Returns the value and the attempt that produced it.
pub async fn complete_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationHandle,
    call: F,
) -> Result<(T, u32), RetryExhausted>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let max_attempts = policy.max_retries + 1;
    let timeout = Duration::from_millis(policy.request_timeout_ms);
    let mut last_error = BackendError::Cancelled;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryExhausted {
                attempts: attempt - 1,
                last_error: BackendError::Cancelled,
            });
        }

        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(BackendError::Timeout(policy.request_timeout_ms)),
        };

        match outcome {
            Ok(value) => return Ok((value, attempt)),
            Err(err) => {
                debug!(attempt, error = %err, "backend attempt failed");
                let retryable = err.is_retryable();
                last_error = err;
                if !retryable || attempt == max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error,
                    });
                }
                tokio::select! {
                    _ = tokio::time::sleep(policy.backoff(attempt)) => {}
                    _ = cancel.cancelled() => {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: BackendError::Cancelled,
                        });
                    }
                }
            }
        }
    }

    Err(RetryExhausted {
        attempts: max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base_ms: 5,
            request_timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff_base_ms, 500);
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let cancel = CancellationHandle::new();
        let (value, attempts) =
            complete_with_retry(&fast_policy(2), &cancel, || async { Ok::<_, BackendError>(7) })
                .await
                .unwrap();
        assert_eq!(value, 7);
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let cancel = CancellationHandle::new();
        let counter = Arc::new(AtomicU32::new(0));
        let result = complete_with_retry(&fast_policy(3), &cancel, {
            let counter = counter.clone();
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::Relaxed) < 2 {
                        Err(BackendError::RateLimited("429".into()))
                    } else {
                        Ok("text".to_string())
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, ("text".to_string(), 3));
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let cancel = CancellationHandle::new();
        let err = complete_with_retry(&fast_policy(1), &cancel, || async {
            Err::<String, _>(BackendError::Network("refused".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.last_error, BackendError::Network("refused".into()));
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let cancel = CancellationHandle::new();
        let calls = Arc::new(AtomicU32::new(0));
        let err = complete_with_retry(&fast_policy(5), &cancel, {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Err::<String, _>(BackendError::Auth("401".into()))
                }
            }
        })
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let cancel = CancellationHandle::new();
        let policy = RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 5,
            request_timeout_ms: 20,
        };
        let err = complete_with_retry(&policy, &cancel, || async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, BackendError>(1)
        })
        .await
        .unwrap_err();
        assert_eq!(err.last_error, BackendError::Timeout(20));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationHandle::new();
        cancel.cancel();
        let err = complete_with_retry(&fast_policy(2), &cancel, || async {
            Ok::<_, BackendError>(1)
        })
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 0);
        assert_eq!(err.last_error, BackendError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let cancel = CancellationHandle::new();
        let policy = RetryPolicy {
            max_retries: 3,
            backoff_base_ms: 60_000,
            request_timeout_ms: 1_000,
        };
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = complete_with_retry(&policy, &cancel, || async {
            Err::<String, _>(BackendError::RateLimited("429".into()))
        })
        .await
        .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(err.attempts, 1);
        assert_eq!(err.last_error, BackendError::Cancelled);
    }
}

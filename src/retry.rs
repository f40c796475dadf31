use crate::config::Config;
use crate::errors::AppError;
use crate::shutdown::Shutdown;
use std::future::Future;
use std::time::Duration;

/// Linear backoff: after failed attempt `n` wait `n * backoff_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.dispatch_max_attempts.max(1),
            backoff_step: config.dispatch_backoff,
        }
    }

    /// Delay between failed attempt `attempt` (1-based) and the next one.
    ///
    /// Saturates at `Duration::MAX` for absurd step sizes.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: AppError },
    /// Shutdown fired during a backoff wait.
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Cancelled { attempts } => *attempts,
        }
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is reached.
///
/// `op` receives the 1-based attempt number. There is no wait before the first
/// attempt nor after the last one.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    shutdown: &Shutdown,
    label: &str,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Attempt {}/{} failed for {}: {}",
                    attempt,
                    max_attempts,
                    label,
                    e
                );

                if attempt >= max_attempts {
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    };
                }

                let delay = policy.delay_after(attempt);
                tracing::debug!("Retrying {} in {:?}", label, delay);
                if !shutdown.sleep(delay).await {
                    tracing::info!("Shutdown during backoff for {}, giving up", label);
                    return RetryOutcome::Cancelled { attempts: attempt };
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[test]
    fn test_huge_step_saturates() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_secs(u64::MAX),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(u64::MAX));
        assert_eq!(policy.delay_after(2), Duration::MAX);
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_short_circuits() {
        let (_trigger, shutdown) = shutdown::channel();
        let calls = Arc::new(Mutex::new(0u32));

        let outcome = retry_with_backoff(&RetryPolicy::default(), &shutdown, "lead 1", |_| {
            let calls = calls.clone();
            async move {
                *calls.lock().unwrap() += 1;
                Ok::<_, AppError>("call-1")
            }
        })
        .await;

        assert!(matches!(
            outcome,
            RetryOutcome::Succeeded {
                value: "call-1",
                attempts: 1
            }
        ));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_waits_only_between_attempts() {
        let (_trigger, shutdown) = shutdown::channel();
        let started = Instant::now();

        let outcome: RetryOutcome<()> =
            retry_with_backoff(&RetryPolicy::default(), &shutdown, "lead 2", |n| async move {
                Err(AppError::ExternalApiError(format!("boom {}", n)))
            })
            .await;

        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error.to_string(), "External API error: boom 3");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        // 2s + 4s, no wait after the last attempt
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff_cancels() {
        let (trigger, shutdown) = shutdown::channel();

        let outcome: RetryOutcome<()> =
            retry_with_backoff(&RetryPolicy::default(), &shutdown, "lead 3", |_| {
                trigger.trigger();
                async { Err(AppError::ExternalApiError("down".to_string())) }
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled { attempts: 1 }));
    }
}

use std::future::Future;
use std::time::Duration;

use crate::application::ports::ServiceError;

/// Bounded retry schedule for external-service calls. Ordinary transient
/// failures back off exponentially from `initial_delay`; a warming service
/// waits the fixed `warmup_delay` instead. Permanent failures are returned
/// immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub warmup_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            warmup_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy for tests: no sleeping, same attempt accounting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            warmup_delay: Duration::ZERO,
        }
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(service = label, error = %e, "Permanent service failure");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        service = label,
                        attempts = attempt,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let wait = match &e {
                        ServiceError::Warming(_) => self.warmup_delay,
                        _ => delay,
                    };
                    tracing::warn!(
                        service = label,
                        attempt = attempt,
                        delay_ms = wait.as_millis() as u64,
                        error = %e,
                        "Service call failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    if !matches!(e, ServiceError::Warming(_)) {
                        delay *= 2;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn given_transient_failures_when_retrying_then_succeeds_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::immediate(5);

        let counter = Arc::clone(&calls);
        let result = policy
            .run("test", move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ServiceError::Transient("not yet".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn given_permanent_failure_when_retrying_then_fails_on_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::immediate(5);

        let counter = Arc::clone(&calls);
        let result: Result<(), _> = policy
            .run("test", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::Permanent("bad request".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn given_endless_transient_failures_when_retrying_then_attempts_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::immediate(4);

        let counter = Arc::clone(&calls);
        let result: Result<(), _> = policy
            .run("test", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::Transient("down".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}

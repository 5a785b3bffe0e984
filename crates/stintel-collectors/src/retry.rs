//! Bounded retry for collector requests.
//!
//! Disabled by default (`max_retries = 0`): failed calls surface in the run
//! result and are retried on the next trigger.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectorError;

const MAX_DELAY: Duration = Duration::from_secs(30);
/// The delay factor stops doubling after this many retries.
const GROWTH_STEPS: u32 = 11;
const MAX_JITTER: f64 = 1.25;

/// How many extra attempts a request gets, and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Un-jittered wait before retry number `retry` (1-based): doubles each
    /// time and stops growing at 30 s.
    pub(crate) fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(GROWTH_STEPS - 1);
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }

    /// Longest a request can take under this policy when each attempt may
    /// run for `per_attempt`, counting the widest jitter on every wait.
    pub(crate) fn worst_case(&self, per_attempt: Duration) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let growing = self.max_retries.min(GROWTH_STEPS);
        let flat = self.max_retries - growing;
        let sleeps = (1..=growing)
            .map(|retry| self.delay_for(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
            .saturating_add(self.delay_for(GROWTH_STEPS).saturating_mul(flat));
        let sleeps = Duration::try_from_secs_f64(sleeps.as_secs_f64() * MAX_JITTER)
            .unwrap_or(Duration::MAX);
        per_attempt.saturating_mul(attempts).saturating_add(sleeps)
    }

    /// Runs `operation`, retrying transient failures per this policy.
    ///
    /// Each wait is [`delay_for`](Self::delay_for) scaled by a random factor
    /// in `[0.75, 1.25)`.
    pub(crate) async fn run<T, F, Fut>(
        &self,
        target: &str,
        mut operation: F,
    ) -> Result<T, CollectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollectorError>>,
    {
        let mut retry = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry >= self.max_retries || !is_transient(&err) {
                return Err(err);
            }
            retry += 1;
            let wait = self.delay_for(retry).mul_f64(rand::random::<f64>() * 0.5 + 0.75);
            tracing::warn!(
                target_path = target,
                retry,
                max_retries = self.max_retries,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "collector request failed, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Network failures and 5xx responses are worth another attempt.
pub(crate) fn is_transient(err: &CollectorError) -> bool {
    match err {
        CollectorError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        CollectorError::Deserialize { .. } | CollectorError::InvalidBaseUrl { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn malformed() -> CollectorError {
        CollectorError::Deserialize {
            context: "/news".to_owned(),
            source: serde_json::from_str::<()>("{").unwrap_err(),
        }
    }

    async fn refused() -> CollectorError {
        CollectorError::Http(
            reqwest::Client::new()
                .get("http://127.0.0.1:1")
                .send()
                .await
                .unwrap_err(),
        )
    }

    #[test]
    fn delay_doubles_and_is_capped() {
        let policy = RetryPolicy::new(20, 1_000);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(12), MAX_DELAY);
    }

    #[test]
    fn worst_case_counts_attempts_and_jittered_waits() {
        let per_attempt = Duration::from_secs(30);
        assert_eq!(RetryPolicy::new(0, 500).worst_case(per_attempt), per_attempt);
        // 3 attempts of 30 s plus (1 s + 2 s) * 1.25
        assert_eq!(
            RetryPolicy::new(2, 1_000).worst_case(per_attempt),
            Duration::from_millis(93_750)
        );
        assert_eq!(
            RetryPolicy::new(u32::MAX, 1_000).worst_case(Duration::MAX),
            Duration::MAX
        );
    }

    #[tokio::test]
    async fn disabled_policy_makes_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::new(0, 0)
            .run("/news", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(refused().await)
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connection_refused_is_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::new(3, 0)
            .run("/news", || {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(refused().await)
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_body_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::new(5, 0)
            .run("/news", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(malformed())
                }
            })
            .await;
        assert!(matches!(result, Err(CollectorError::Deserialize { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!is_transient(&malformed()));
    }
}

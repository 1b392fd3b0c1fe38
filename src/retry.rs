// Bounded retry and polling shared by every adapter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Growth factor applied per attempt; `1.0` polls at a fixed interval.
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fraction of each delay randomised, in `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Fixed-interval polling that gives up after roughly `timeout`.
    pub fn polling(timeout: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let attempts = (timeout.as_millis() / interval.as_millis()).max(1) + 1;
        Self {
            max_attempts: attempts.min(u32::MAX as u128) as u32,
            base_delay: interval,
            multiplier: 1.0,
            max_delay: interval,
            jitter: 0.0,
        }
    }

    /// Exponential backoff for retrying transient failures.
    pub fn backoff(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before attempt `attempt + 1`, where `attempt` counts from 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let raw = self.base_delay.as_secs_f64() * exp;
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter > 0.0 {
            let spread = capped * self.jitter;
            capped - spread + rand::rng().random_range(0.0..=2.0 * spread)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    "Attempt {attempt}/{attempts} failed: {e}; retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check-then-sleep until `check` yields a value. `None` means the budget ran out.
pub async fn poll_until<T, F, Fut>(policy: &RetryPolicy, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let attempts = policy.attempts();
    for attempt in 1..=attempts {
        if let Some(value) = check().await {
            return Some(value);
        }
        if attempt < attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            max_delay: Duration::from_millis(4),
            jitter: 0.0,
        }
    }

    #[test]
    fn delays_grow_and_cap() {
        let policy = fast(5);
        assert_eq!(policy.delay_for(1), Duration::from_millis(1));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4));
        assert_eq!(policy.delay_for(4), Duration::from_millis(4));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let policy = RetryPolicy {
            jitter: 0.5,
            ..RetryPolicy::backoff(3, Duration::from_millis(100))
        };
        for _ in 0..50 {
            let d = policy.delay_for(1);
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn polling_policy_covers_timeout() {
        let policy = RetryPolicy::polling(Duration::from_secs(15), Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 31);
        assert_eq!(policy.delay_for(10), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn retry_stops_on_success() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry(
            &fast(5),
            |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 3 {
                        Err("flaky".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry(
            &fast(4),
            |_| {
                calls.set(calls.get() + 1);
                async { Err("down".to_string()) }
            },
            |_| true,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn retry_does_not_repeat_permanent_errors() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry(
            &fast(4),
            |_| {
                calls.set(calls.get() + 1);
                async { Err("bad request".to_string()) }
            },
            |e| !e.contains("bad"),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn poll_returns_first_value() {
        let calls = Cell::new(0);
        let found = poll_until(&fast(10), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { (n >= 4).then_some(n) }
        })
        .await;
        assert_eq!(found, Some(4));
    }

    #[tokio::test]
    async fn poll_times_out_with_none() {
        let found: Option<()> = poll_until(&fast(3), || async { None }).await;
        assert!(found.is_none());
    }
}

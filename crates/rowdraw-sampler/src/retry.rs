use std::time::Duration;

use rowdraw_common::error::Result;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        let delay = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or attempts run
    /// out. Each retry performed is added to `retries`.
    pub fn run<T>(
        &self,
        operation: &str,
        retries: &mut u64,
        mut op: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient store failure, retrying"
                    );
                    *retries += 1;
                    attempt += 1;
                    std::thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rowdraw_common::error::Error;

    use super::*;

    fn fast() -> RetryPolicy {
        RetryPolicy::default()
            .with_initial_backoff(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(2))
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
        assert_eq!(policy.backoff(20), Duration::from_millis(500));
    }

    #[test]
    fn test_retries_transient_until_success() {
        let mut calls = 0;
        let mut retries = 0;
        let result = fast().run("lookup", &mut retries, || {
            calls += 1;
            if calls < 3 {
                Err(Error::store_unavailable("reset"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(retries, 2);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let mut retries = 0;
        let result: Result<()> = fast().run("lookup", &mut retries, || {
            calls += 1;
            Err(Error::store_unavailable("down"))
        });
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert_eq!(calls, 3);
        assert_eq!(retries, 2);
    }

    #[test]
    fn test_does_not_retry_fatal_errors() {
        let mut calls = 0;
        let mut retries = 0;
        let result: Result<()> = fast().run("describe", &mut retries, || {
            calls += 1;
            Err(Error::unknown_relation("t"))
        });
        assert!(matches!(result, Err(Error::UnknownRelation(_))));
        assert_eq!(calls, 1);
        assert_eq!(retries, 0);
    }

    #[test]
    fn test_none_is_single_attempt() {
        let mut calls = 0;
        let mut retries = 0;
        let _ = RetryPolicy::none().run("count", &mut retries, || -> Result<()> {
            calls += 1;
            Err(Error::store_unavailable("x"))
        });
        assert_eq!(calls, 1);
    }
}

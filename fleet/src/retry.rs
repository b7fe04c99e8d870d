//! Bounded retry with a fixed backoff and an explicit fallback

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Try an operation a fixed number of times, sleeping between failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run `attempt` until it yields `Some`.
    ///
    /// `attempt` receives the 1-based attempt number. When every attempt
    /// returns `None`, `on_fallback` runs once and `fallback` is returned.
    /// There is no sleep after the final attempt.
    pub async fn run<T, F, Fut, G>(&self, mut attempt: F, fallback: T, on_fallback: G) -> T
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
        G: FnOnce(),
    {
        for n in 1..=self.max_attempts {
            if let Some(value) = attempt(n).await {
                return value;
            }
            debug!(attempt = n, max = self.max_attempts, "Attempt produced no value");
            if n < self.max_attempts {
                tokio::time::sleep(self.backoff).await;
            }
        }

        on_fallback();
        fallback
    }
}

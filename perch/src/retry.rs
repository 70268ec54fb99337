use shared::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential,
}

/// Bounded retry for rate-limited upstream calls
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
    /// Cap applied to every sleep, server hints included
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff,
            max_delay: Duration::from_secs(120),
        }
    }

    /// Identifier lookup: 3 attempts, fixed short delay
    pub fn author_lookup() -> Self {
        Self::new(3, Duration::from_secs(1), Backoff::Fixed)
    }

    /// Timeline listing: 3 attempts, 60s then exponential
    pub fn timeline() -> Self {
        Self::new(3, Duration::from_secs(60), Backoff::Exponential)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Policy delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    fn next_delay(&self, retry: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for(retry),
        }
    }
}

/// Run `op` until it succeeds, fails with a non rate-limit error, or the
/// policy's attempts are spent. The last `RateLimited` error is returned on
/// exhaustion.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limit() && attempt < policy.max_attempts => {
                let delay = policy.next_delay(attempt, err.retry_after());
                warn!(
                    "{} rate limited (attempt {}/{}), retrying in {:?}",
                    label, attempt, policy.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// src/services/retry.rs
//
// Bounded retry with backoff for transient provider failures.

use log::warn;
use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally with +/- 50% jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(3),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { base, factor, max, jitter } => {
                let seconds = base.as_secs_f64() * factor.powi(attempt as i32);
                let delay = Duration::from_secs_f64(seconds.min(max.as_secs_f64()));
                if !jitter {
                    return delay;
                }
                let half = delay.as_millis() as u64 / 2;
                let offset = fastrand::u64(0..=half * 2);
                Duration::from_millis((delay.as_millis() as u64 + offset).saturating_sub(half))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        RetryConfig {
            max_retries,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn no_retry() -> Self {
        RetryConfig {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The last error is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.backoff.delay(attempt);
                warn!(
                    "Attempt {} failed ({}); retrying in {:?}",
                    attempt + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

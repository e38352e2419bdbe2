//! Exponential backoff for transient failures
//!
//! The first attempt runs immediately. After the n-th failure the operation
//! waits `base ^ n` time units before trying again, up to `max_retries`
//! retries; the failure of the last attempt is returned unchanged.

use crate::config::CrawlerConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Growth factor of the delay
    pub base: f64,

    /// Length of one delay unit (one second outside of tests)
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base: 1.5,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: config.backoff_base,
            unit: Duration::from_secs(1),
        }
    }

    /// A policy with the same retry budget but no waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base: 1.5,
            unit: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (starting at 1)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.base.powi(exponent);
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

/// Runs `operation` until it succeeds or the retry budget is spent
///
/// `what` names the operation in log lines (usually the URL).
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, what: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_sleep(policy, what, operation, tokio::time::sleep).await
}

async fn retry_with_sleep<T, E, F, Fut, S, SleepFut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
    mut sleep: S,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    S: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ()>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    tracing::error!("Giving up on {} after {} attempts: {}", what, attempt, e);
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Attempt {} for {} failed: {} (retrying in {:.1?})",
                    attempt,
                    what,
                    e,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}

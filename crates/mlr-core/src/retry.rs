//! Retry with exponential backoff for transient upstream failures.
//!
//! A failure is transient when its message carries the "service unavailable"
//! signature of an overloaded generation backend (`503` plus `UNAVAILABLE`).
//! Anything else fails fast. This is the only place in the workspace where a
//! failure is absorbed instead of propagated.
//!
//! Attempts are numbered from zero. After a transient failure on attempt `a`
//! with `a < max_retries`, the wrapper sleeps `base_delay * 2^a` and tries
//! again; the failure of the final attempt propagates unmodified.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::metrics::METRICS;

/// Backoff configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Build a policy from a base delay in (fractional) seconds.
    pub fn from_secs_f64(max_retries: u32, base_delay_secs: f64) -> Self {
        Self::new(max_retries, Duration::from_secs_f64(base_delay_secs.max(0.0)))
    }

    /// Wait before retrying after a failure on `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Whether a failure message matches the overloaded-service signature.
pub fn is_transient_overload(message: &str) -> bool {
    message.contains("503") && message.contains("UNAVAILABLE")
}

/// Run `op` under `policy`, retrying transient failures.
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_async_if(policy, |e: &E| is_transient_overload(&e.to_string()), op).await
}

/// Like [`retry_async`] with a caller-supplied transient classifier.
pub async fn retry_async_if<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    is_transient: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && is_transient(&err) => {
                let delay = policy.delay_for(attempt);
                METRICS.inc_retries();
                crate::obs::emit_retry_scheduled(
                    attempt + 1,
                    policy.max_retries,
                    delay.as_millis() as u64,
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Blocking variant of [`retry_async`] for synchronous callers.
pub fn retry_blocking<T, E, F>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && is_transient_overload(&err.to_string()) => {
                let delay = policy.delay_for(attempt);
                METRICS.inc_retries();
                crate::obs::emit_retry_scheduled(
                    attempt + 1,
                    policy.max_retries,
                    delay.as_millis() as u64,
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

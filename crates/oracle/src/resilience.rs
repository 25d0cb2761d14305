//! Timeout + retry with exponential backoff around a single provider call.
//!
//! Each attempt is raced against a per-attempt deadline. A missed deadline
//! counts as an ordinary failure. Between attempts the invoker sleeps
//! `base_delay * 2^attempt_index` (no jitter). The last failure is returned
//! once attempts run out.

use std::future::Future;
use std::time::Duration;

use apeiron_config::ResilienceConfig;
use apeiron_core::error::ProviderError;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 behaves like 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Deadline for each individual attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt_index` (0-based).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl From<&ResilienceConfig> for RetryPolicy {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay(),
            timeout: config.request_timeout(),
        }
    }
}

/// Runs an operation under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ResilientInvoker {
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `operation` until it succeeds or attempts run out.
    ///
    /// `operation` is invoked once per attempt, so it must build a fresh
    /// future each time. An operation that fails immediately is handled the
    /// same as one that fails after awaiting.
    pub async fn invoke<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = ProviderError::NotConfigured("No attempts made".into());

        for attempt in 0..attempts {
            let outcome = match tokio::time::timeout(self.policy.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout("Request timeout".into())),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.policy.delay_for(attempt)).await;
            }
        }

        Err(last_error)
    }
}

//! Jittered exponential backoff for protocol calls.

use crate::error::DomainCheckError;
use crate::types::CheckConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Retry settings. Each call to [`RetryPolicy::run`] keeps its own attempt
/// counter and backoff, so domains never share retry state.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CheckConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            factor: config.backoff_factor,
        }
    }

    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff that follows `current`, clamped to `max_backoff`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.factor.max(1.0);
        Duration::from_secs_f64(grown.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// retry budget is spent. Shutdown wins over everything else.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        shutdown: &CancellationToken,
        mut op: F,
    ) -> Result<T, DomainCheckError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainCheckError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                return Err(DomainCheckError::cancelled(label));
            }

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.max_retries {
                return Err(err);
            }

            let delay = jitter(backoff);
            debug!(label, attempt, ?delay, error = %err, "retrying after transient error");
            tokio::select! {
                _ = shutdown.cancelled() => return Err(DomainCheckError::cancelled(label)),
                _ = tokio::time::sleep(delay) => {}
            }

            backoff = self.next_backoff(backoff);
            attempt += 1;
        }
    }
}

/// Uniform delay in `[0, backoff)`.
fn jitter(backoff: Duration) -> Duration {
    backoff.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
}

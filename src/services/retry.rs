//! Retry with exponential backoff for transient upstream failures.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::RetryConfig;

/// Retry policy for handling transient errors.
///
/// Only errors for which [`RagError::is_transient`] holds are retried.
/// Delays start at `initial_backoff` and double up to `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    ///
    /// # Arguments
    /// * `max_retries` - Retries after the first attempt
    /// * `initial_backoff_ms` - First delay
    /// * `max_backoff_ms` - Delay ceiling, raised to `initial_backoff_ms` if lower
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms.max(initial_backoff_ms)),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute an operation with exponential backoff retry logic.
    ///
    /// # Arguments
    /// * `operation` - Produces a fresh attempt each time it is called
    ///
    /// # Returns
    /// * `Ok(T)` - An attempt succeeded
    /// * `Err(RagError)` - A permanent error, or the last transient error once retries ran out
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> RagResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RagResult<T>>,
    {
        let schedule = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build();

        let max_retries = self.max_retries;
        let mut attempt: u32 = 0;

        backoff::future::retry_notify(
            schedule,
            || {
                attempt += 1;
                let current = attempt;
                let fut = operation();
                async move {
                    fut.await.map_err(|err| {
                        if err.is_transient() && current <= max_retries {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: RagError, delay: Duration| {
                tracing::warn!(
                    error = %err,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Transient error, retrying"
                );
            },
        )
        .await
    }
}

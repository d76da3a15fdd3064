//! Bounded retry for optimistic balance writes.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use greatbank_shared::config::EngineConfig;

use super::error::LedgerError;
use crate::store::StoreError;

/// Result of one attempt inside a retry loop.
#[derive(Debug)]
pub(crate) enum Attempt {
    /// A conditional write lost a race. Re-read and try again.
    Conflict(StoreError),
    /// Terminal for this call.
    Fail(LedgerError),
}

impl From<StoreError> for Attempt {
    fn from(err: StoreError) -> Self {
        if err.is_conflict() {
            Self::Conflict(err)
        } else {
            Self::Fail(err.into())
        }
    }
}

impl From<LedgerError> for Attempt {
    fn from(err: LedgerError) -> Self {
        Self::Fail(err)
    }
}

/// How often, and how patiently, a conflicting write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy. Attempt `n` waits `n * backoff` before retrying.
    #[must_use]
    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Builds the policy from engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.max_conflict_retries,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Total attempts including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Runs `step` until it succeeds, fails terminally, or conflicts
    /// `max_attempts` times in a row, which yields [`LedgerError::Unavailable`].
    pub(crate) async fn run<T, F, Fut>(&self, operation: &'static str, mut step: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Attempt>>,
    {
        let attempts = self.max_attempts();
        for attempt in 1..=attempts {
            match step().await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fail(err)) => return Err(err),
                Err(Attempt::Conflict(conflict)) => {
                    warn!(operation, attempt, error = %conflict, "balance write conflicted");
                    if attempt < attempts && !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        Err(LedgerError::Unavailable { attempts })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

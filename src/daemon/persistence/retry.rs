use std::time::Duration;

use tracing::warn;

use crate::{
    daemon::storage::{PersistenceError, PersistenceGateway},
    tracker::totals::Totals,
    utils::clock::Clock,
};

/// Bounded exponential backoff used for saving totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (starting at 1).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Saves totals, retrying failures according to `policy`. Returns the last error if every
/// attempt failed.
pub async fn save_with_retry(
    gateway: &impl PersistenceGateway,
    totals: &Totals,
    policy: &RetryPolicy,
    clock: &dyn Clock,
) -> Result<(), PersistenceError> {
    let mut attempt = 1;
    loop {
        match gateway.save(totals).await {
            Ok(()) => return Ok(()),
            Err(e) if !e.is_retryable() || attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                let backoff = policy.backoff_after(attempt);
                warn!(
                    "Saving attempt {attempt}/{} failed, retrying in {backoff:?}: {e}",
                    policy.max_attempts
                );
                clock.sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

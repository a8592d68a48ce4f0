use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::core::error::{IssuanceError, IssuanceResult};

/// Fixed-delay retry budget for the validation status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Checks allowed after the first one
    pub retries: u32,
    /// Sleep before each retry
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(30_000),
        }
    }
}

impl PollPolicy {
    pub fn max_checks(&self) -> u32 {
        self.retries + 1
    }
}

/// Runs `check` until it returns `Ok(true)` or the policy's budget is spent.
///
/// - `Ok(true)` stops immediately and returns the number of checks made
/// - `Ok(false)` sleeps `policy.delay` and checks again
/// - `Err(_)` is returned as-is without retrying
///
/// Exhausting the budget yields [`IssuanceError::ValidationTimeout`].
pub async fn poll_until<F, Fut>(
    operation: &str,
    policy: PollPolicy,
    mut check: F,
) -> IssuanceResult<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = IssuanceResult<bool>>,
{
    let started = Instant::now();
    let max_checks = policy.max_checks();

    for attempt in 1..=max_checks {
        debug!("[poll] {operation} check {attempt}/{max_checks}");

        if check().await? {
            debug!(
                "[poll] {operation} complete after {}ms (check {attempt})",
                started.elapsed().as_millis()
            );
            return Ok(attempt);
        }

        if attempt < max_checks {
            debug!(
                "[poll] {operation} pending, waiting {}ms before next check",
                policy.delay.as_millis()
            );
            tokio::time::sleep(policy.delay).await;
        }
    }

    warn!(
        "[poll] {operation} still pending after {max_checks} checks ({}ms)",
        started.elapsed().as_millis()
    );
    Err(IssuanceError::ValidationTimeout {
        attempts: max_checks,
    })
}

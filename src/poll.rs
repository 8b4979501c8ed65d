//! Condition Poller
//!
//! Waits for asynchronous server-side state changes by re-running a check at a
//! fixed interval. Every wait is bounded: when the deadline passes without the
//! check completing, [`poll_until`] fails with [`Error::PollTimeout`].

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default delay between checks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Default deadline for a whole wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Timing of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_TIMEOUT)
    }
}

/// Sleep `interval`, run `check`, repeat.
///
/// - `Ok(true)` ends the wait successfully.
/// - `Ok(false)` keeps waiting.
/// - `Err(e)` ends the wait at once with `e`; the check is not retried.
///
/// No check starts once `timeout` has elapsed, and a check still running at
/// the deadline is dropped, so the whole wait is bounded by `timeout`.
/// Dropping the returned future cancels the wait.
pub async fn poll_until<F, Fut>(mut check: F, config: PollConfig) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        let Some(left) = time_left(start, config.timeout) else {
            return Err(timed_out(start, attempts));
        };

        tokio::time::sleep(config.interval.min(left)).await;

        let Some(left) = time_left(start, config.timeout) else {
            return Err(timed_out(start, attempts));
        };

        attempts += 1;

        match tokio::time::timeout(left, check()).await {
            Ok(Ok(true)) => {
                tracing::debug!("condition met after {} checks", attempts);
                return Ok(());
            }
            Ok(Ok(false)) => tracing::trace!("check {} not satisfied", attempts),
            Ok(Err(e)) => {
                tracing::debug!("check {} failed: {}", attempts, e);
                return Err(e);
            }
            Err(_) => {
                tracing::debug!("check {} still running at the deadline", attempts);
                return Err(timed_out(start, attempts));
            }
        }
    }
}

/// Time left before `timeout`, or `None` once it has passed
fn time_left(start: Instant, timeout: Duration) -> Option<Duration> {
    timeout
        .checked_sub(start.elapsed())
        .filter(|left| !left.is_zero())
}

fn timed_out(start: Instant, attempts: u32) -> Error {
    let elapsed = start.elapsed();
    tracing::warn!("condition not met after {} checks ({:?})", attempts, elapsed);
    Error::PollTimeout { elapsed }
}

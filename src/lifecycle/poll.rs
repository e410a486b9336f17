use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Result, WorkloadError};

/// Poll `check` until it reports `Ok(true)`, checking once immediately and
/// then every `interval`.
///
/// A check that fails is logged and retried on the next tick. The loop ends
/// with [`WorkloadError::Timeout`] when `timeout` elapses and with
/// [`WorkloadError::Cancelled`] when `cancel` fires, including while a check
/// is still in flight. A check that is ready when polled wins over an
/// expired deadline, so the first check always runs even with a zero
/// timeout.
pub async fn poll_until<F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    let timed_out = || WorkloadError::Timeout {
        what: what.to_string(),
        waited: timeout,
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(WorkloadError::Cancelled(what.to_string()));
            }
            result = check() => match result {
                Ok(true) => return Ok(()),
                Ok(false) => trace!(what, "condition not met yet"),
                Err(e) => debug!(what, error = %e, "poll check failed, retrying"),
            },
            _ = sleep_until(deadline) => return Err(timed_out()),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(WorkloadError::Cancelled(what.to_string()));
            }
            _ = sleep_until(deadline) => return Err(timed_out()),
            _ = sleep(interval) => {}
        }
    }
}

//! Retry loop: run a closure until success or policy says stop.

use std::time::{Duration, Instant};

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::ShutdownSignal;
use crate::error::Error;

/// Granularity of the shutdown check while backing off.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
/// The closure receives the 1-based attempt number. A shutdown request
/// before or during the backoff returns the last error instead of retrying.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, shutdown: &ShutdownSignal, mut f: F) -> Result<T, Error>
where
    F: FnMut(u32) -> Result<T, Error>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        if shutdown.is_requested() {
                            return Err(e);
                        }
                        tracing::warn!(attempt, delay_ms = d.as_millis() as u64, "{}; retrying", e);
                        if !sleep_unless_shutdown(d, shutdown) {
                            tracing::debug!(attempt, "shutdown requested during backoff; giving up");
                            return Err(e);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}

/// Sleep for `d` in slices. Returns false if shutdown was requested meanwhile.
fn sleep_unless_shutdown(d: Duration, shutdown: &ShutdownSignal) -> bool {
    let deadline = Instant::now() + d;
    loop {
        if shutdown.is_requested() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

use std::time::Duration;

use crate::config::RetryConfig;

/// High-level classification of an error for retry purposes.
///
/// Callers map curl errors or IO failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read) or stalled below the low-speed limit.
    Timeout,
    /// Network-level failure (connection reset, DNS, server went away).
    Connection,
    /// Any other error (not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Simple exponential backoff policy with caps.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(cfg.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout | ErrorKind::Connection => {
                // base * 2^(attempt-1), capped.
                let exp = 1u32.saturating_mul(1 << attempt.saturating_sub(1).min(8));
                let raw = self.base_delay.saturating_mul(exp);
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
        }
    }
}

//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, connection
//! failures) and exponential backoff decisions so the download loop can retry
//! a transient fetch failure before giving up on the entry.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;

//! Retry loop: run a transfer until success or the policy says stop.

use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
/// On retryable failure, logs a warning, sleeps for the backoff duration,
/// then tries again. The classifier maps errors to retry kinds so this loop
/// stays independent of any concrete error type.
pub fn run_with_retry<T, E, C, F>(policy: &RetryPolicy, classify: C, mut f: F) -> Result<T, E>
where
    E: std::fmt::Display,
    C: Fn(&E) -> ErrorKind,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, "transfer failed, retrying in {:?}: {}", d, e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

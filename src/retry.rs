use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

/// `unit * n` before retry `n`; the first attempt never waits.
pub fn linear_backoff(unit: Duration) -> impl Fn(u32) -> Duration {
    move |attempt| unit * attempt
}

/// Runs `op` up to `attempts` times (at least once).
///
/// After failed attempt `n` the loop sleeps `backoff(n)` and tries again, unless
/// `should_retry` rejects the error or the attempts are used up, in which case
/// that error is returned as-is. `op` receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut, B, P>(
    attempts: u32,
    backoff: B,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32) -> Duration,
    P: Fn(&E) -> bool,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && should_retry(&e) => {
                let wait = backoff(attempt);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "attempt failed; retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

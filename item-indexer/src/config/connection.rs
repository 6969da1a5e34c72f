//! Connection retries for the broker and the search backend.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// How many times to try reaching a backend, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of tries, the first one included.
    pub attempts: u32,
    /// Delay between two consecutive tries.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

/// Run `connect` until it succeeds or the policy's attempts are used up.
///
/// A policy with zero attempts still tries once.
///
/// # Returns
///
/// * `Ok(T)` - The first successful result
/// * `Err(E)` - The error of the last try
pub async fn connect_with_retry<T, E, F, Fut>(
    target: &str,
    policy: RetryPolicy,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(connection) => {
                info!(target_name = %target, attempt = attempt, "Connected");
                return Ok(connection);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    target_name = %target,
                    attempt = attempt,
                    max_attempts = attempts,
                    retry_delay_secs = policy.delay.as_secs(),
                    error = %e,
                    "Connection failed, retrying..."
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    target_name = %target,
                    attempts = attempts,
                    error = %e,
                    "Connection failed, giving up"
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<&str, String> =
            connect_with_retry("test", RetryPolicy::new(5, Duration::from_secs(2)), move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("refused".to_string())
                } else {
                    Ok("connected")
                }
            })
            .await;

        assert_eq!(result, Ok("connected"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempts() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), String> =
            connect_with_retry("test", RetryPolicy::new(3, Duration::from_secs(5)), move || async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("refused {}", call))
            })
            .await;

        assert_eq!(result, Err("refused 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_tries_once() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), String> =
            connect_with_retry("test", RetryPolicy::new(0, Duration::from_secs(1)), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("refused".to_string())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

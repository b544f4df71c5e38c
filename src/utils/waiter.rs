//! Bounded readiness polling

use anyhow::{Result, anyhow};
use std::time::Duration;

/// Fixed-interval retry policy.
///
/// No backoff and no jitter: interactive installs want a predictable
/// wall-clock bound of `interval × max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time the policy may block for.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Poll `check` until it yields a value, sleeping `policy.interval` between
/// attempts. The check must be side-effect-free apart from its query; it is
/// re-invoked unchanged each attempt. Exhausting the attempt budget is an
/// error the caller treats as fatal.
pub fn wait_until<T>(
    policy: &RetryPolicy,
    what: &str,
    check: impl FnMut() -> Option<T>,
) -> Result<T> {
    let spinner = crate::utils::progress::spinner(&format!("Waiting for {}", what));
    let result = wait_until_with_sleep(policy, what, check, std::thread::sleep);
    match &result {
        Ok(_) => spinner.finish_with_message(format!("{} is ready", what)),
        Err(_) => spinner.finish_and_clear(),
    }
    result
}

/// Same as [`wait_until`] with the sleep function injected so tests can run
/// against a fake clock.
pub fn wait_until_with_sleep<T>(
    policy: &RetryPolicy,
    what: &str,
    mut check: impl FnMut() -> Option<T>,
    mut sleep: impl FnMut(Duration),
) -> Result<T> {
    for _ in 0..policy.max_attempts {
        if let Some(value) = check() {
            return Ok(value);
        }
        sleep(policy.interval);
    }

    Err(anyhow!(
        "{} was not ready after {} attempts ({}s)",
        what,
        policy.max_attempts,
        policy.budget().as_secs()
    ))
}

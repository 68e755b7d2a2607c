use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::errors::ScrapeError;

/// Sleeps between attempts and between courtesy pauses.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

impl<T: Pacer + ?Sized> Pacer for Arc<T> {
    fn pause(&self, duration: Duration) {
        (**self).pause(duration)
    }
}

pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// `max_retries` extra attempts after the first one, `delay` between them.
/// Anti-bot (403) retries wait twice as long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn blocked_delay(&self) -> Duration {
        self.delay * 2
    }
}

/// Why an attempt may be worth repeating.
#[derive(Debug, Clone)]
pub enum RetryCause {
    Timeout(String),
    Transport(String),
    Status(u16),
    Blocked,
}

impl RetryCause {
    fn delay(&self, policy: &RetryPolicy) -> Duration {
        match self {
            RetryCause::Blocked => policy.blocked_delay(),
            _ => policy.delay,
        }
    }

    fn exhausted(self, url: &str, attempts: u32, policy: &RetryPolicy) -> ScrapeError {
        let url = url.to_string();
        match self {
            RetryCause::Blocked => ScrapeError::RateLimited {
                url,
                retry_after: policy.blocked_delay(),
            },
            RetryCause::Timeout(reason) => ScrapeError::Network {
                url,
                attempts,
                timed_out: true,
                reason: format!("timed out: {reason}"),
            },
            RetryCause::Transport(reason) => ScrapeError::Network {
                url,
                attempts,
                timed_out: false,
                reason,
            },
            RetryCause::Status(code) => ScrapeError::Network {
                url,
                attempts,
                timed_out: false,
                reason: format!("HTTP {code}"),
            },
        }
    }
}

/// Result of a single attempt.
pub enum Step<T> {
    Done(T),
    Retry(RetryCause),
    Fail(ScrapeError),
}

/// Runs `attempt` until it finishes, fails for good, or the policy runs out.
/// The closure receives the 1-based attempt number.
pub fn with_retries<T, P, F>(
    policy: &RetryPolicy,
    pacer: &P,
    url: &str,
    mut attempt: F,
) -> Result<T, ScrapeError>
where
    P: Pacer + ?Sized,
    F: FnMut(u32) -> Step<T>,
{
    let max_attempts = policy.max_attempts();
    let mut n = 1;

    loop {
        match attempt(n) {
            Step::Done(value) => return Ok(value),
            Step::Fail(err) => return Err(err),
            Step::Retry(cause) => {
                if n >= max_attempts {
                    return Err(cause.exhausted(url, n, policy));
                }

                let wait = cause.delay(policy);
                warn!(url, attempt = n, ?cause, wait_ms = wait.as_millis() as u64, "⚠️ attempt failed, retrying");
                pacer.pause(wait);
                n += 1;
            }
        }
    }
}

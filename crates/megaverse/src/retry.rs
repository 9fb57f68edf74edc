//! Bounded retry state machine for outbound requests.
//!
//! The transition function performs no I/O: the async driver in
//! [`crate::client`] sends the request, feeds the outcome in, and acts on the
//! returned [`Phase`] (sleep, re-send, return, or fail).
//!
//! Two failure classes share one retry counter:
//! - a 429 with budget left backs off for the current delay, then doubles it;
//! - any other failure (transport error, non-2xx status, or a 429 once the
//!   budget is spent) re-attempts immediately while budget remains.
//!
//! Once the budget is spent the next failure is terminal, so a request is
//! attempted at most `max_retries + 1` times.

use std::time::Duration;

use crate::types::MegaverseError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry limits for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after `n` consecutive rate-limit responses.
    pub fn backoff_after(&self, n: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(n))
    }
}

/// Result of one attempt, as seen by the state machine.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    RateLimited,
    Failed(MegaverseError),
}

/// Where the request goes next.
#[derive(Debug)]
pub enum Phase<T> {
    /// Send again now.
    Attempting,
    /// Sleep for the given delay, then send again.
    BackingOff(Duration),
    Succeeded(T),
    Exhausted(MegaverseError),
}

/// Per-request retry bookkeeping. Discarded once the request resolves.
#[derive(Debug, Clone)]
pub struct RetryState {
    retries: u32,
    delay: Duration,
    max_retries: u32,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            retries: 0,
            delay: policy.base_delay,
            max_retries: policy.max_retries,
        }
    }

    /// Retries consumed so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay the next rate-limit backoff would wait.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn has_budget(&self) -> bool {
        self.retries < self.max_retries
    }

    /// Advance on the outcome of the latest attempt.
    pub fn transition<T>(&mut self, outcome: AttemptOutcome<T>) -> Phase<T> {
        match outcome {
            AttemptOutcome::Success(value) => Phase::Succeeded(value),
            AttemptOutcome::RateLimited if self.has_budget() => {
                let wait = self.delay;
                self.delay = self.delay.saturating_mul(2);
                self.retries += 1;
                Phase::BackingOff(wait)
            }
            AttemptOutcome::RateLimited => {
                self.fail(MegaverseError::Http { status: 429 })
            }
            AttemptOutcome::Failed(err) => self.fail(err),
        }
    }

    fn fail<T>(&mut self, err: MegaverseError) -> Phase<T> {
        if self.has_budget() {
            self.retries += 1;
            Phase::Attempting
        } else {
            Phase::Exhausted(MegaverseError::RetriesExhausted {
                attempts: self.retries + 1,
                last: Box::new(err),
            })
        }
    }
}

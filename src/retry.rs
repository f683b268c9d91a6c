//! Bounded retry with exponential backoff around a single request.
//!
//! The policy is a small state machine: given the attempt number and the last
//! [TransportError], [RetryPolicy::decide] says whether to retry, degrade to an
//! empty result, or surface the failure to the caller.
use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of attempts, initial request included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
/// Default backoff before the first retry, doubled on each further retry.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// What to do with a transient failure once the attempts are used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedAction {
    /// treat as "no data" and return the empty default
    Degrade,
    /// return the failure to the caller
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Degrade,
    Surface,
}

/// Result of running a request under a [RetryPolicy].
#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success(T),
    Degraded(TransportError),
    Surfaced(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// total attempts including the first one, at least 1
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// applied to exhausted timeouts and resets
    pub on_timeout: ExhaustedAction,
    /// applied to exhausted connection failures
    pub on_connect_failure: ExhaustedAction,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            on_timeout: ExhaustedAction::Degrade,
            on_connect_failure: ExhaustedAction::Surface,
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_attempts={}, backoff_ms={}, on_timeout={:?}, on_connect_failure={:?}",
            self.max_attempts,
            self.initial_backoff.as_millis(),
            self.on_timeout,
            self.on_connect_failure
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            initial_backoff,
            ..Default::default()
        }
    }

    pub fn on_timeout(self, action: ExhaustedAction) -> Self {
        RetryPolicy {
            on_timeout: action,
            ..self
        }
    }

    pub fn on_connect_failure(self, action: ExhaustedAction) -> Self {
        RetryPolicy {
            on_connect_failure: action,
            ..self
        }
    }

    /// Backoff to wait after failed attempt number `attempt` (starting at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exp)
    }

    /// Decide the next step after attempt number `attempt` (starting at 1)
    /// failed with `error`.
    pub fn decide(&self, attempt: u32, error: &TransportError) -> RetryDecision {
        let exhausted_action = match error {
            TransportError::Timeout(_) | TransportError::Reset(_) => self.on_timeout,
            TransportError::Connect(_) => self.on_connect_failure,
            TransportError::Status(_) | TransportError::Decode(_) => {
                return RetryDecision::Degrade
            }
            TransportError::Closed => return RetryDecision::Surface,
        };
        if attempt < self.max_attempts.max(1) {
            return RetryDecision::Retry(self.backoff(attempt));
        }
        match exhausted_action {
            ExhaustedAction::Degrade => RetryDecision::Degrade,
            ExhaustedAction::Surface => RetryDecision::Surface,
        }
    }

    /// Run `op` until it succeeds or the policy gives up.
    pub fn run<T, F>(&self, url: &str, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Result<T, TransportError>,
    {
        let mut attempt = 1;
        loop {
            let error = match op() {
                Ok(value) => return RetryOutcome::Success(value),
                Err(e) => e,
            };
            match self.decide(attempt, &error) {
                RetryDecision::Retry(backoff) => {
                    warn!(
                        "request failed for {} (attempt {}/{}), retrying in {}ms: {}",
                        url,
                        attempt,
                        self.max_attempts,
                        backoff.as_millis(),
                        error
                    );
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                    }
                    attempt += 1;
                }
                RetryDecision::Degrade => {
                    debug!("request failed for {} after {} attempts", url, attempt);
                    return RetryOutcome::Degraded(error);
                }
                RetryDecision::Surface => return RetryOutcome::Surfaced(error),
            }
        }
    }
}

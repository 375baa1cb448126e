use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::backoff::{exponential_backoff, Backoff};
use super::check::{default_check, BoxError, Check};

/// Retry policy: wait bounds, retry budget and pluggable predicate / backoff.
///
/// Cloning is cheap (the predicate and backoff are shared function handles), and
/// nothing in a policy is mutated by a run, so one value can drive any number of
/// concurrent runs.
pub struct Policy<T, E> {
    /// Lower bound handed to the backoff function.
    pub wait_min: Duration,
    /// Upper bound handed to the backoff function.
    pub wait_max: Duration,
    /// Maximum number of retries after the first attempt. `0` still runs once.
    pub retry_max: u32,
    /// Predicate; `None` retries on any error.
    pub check: Option<Check<T, E>>,
    /// Backoff function; `None` uses [`exponential_backoff`].
    pub backoff: Option<Backoff>,
}

impl<T, E> Default for Policy<T, E> {
    fn default() -> Self {
        Self {
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(30),
            retry_max: 4,
            check: None,
            backoff: None,
        }
    }
}

impl<T, E> Clone for Policy<T, E> {
    fn clone(&self) -> Self {
        Self {
            wait_min: self.wait_min,
            wait_max: self.wait_max,
            retry_max: self.retry_max,
            check: self.check.clone(),
            backoff: self.backoff.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Policy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("wait_min", &self.wait_min)
            .field("wait_max", &self.wait_max)
            .field("retry_max", &self.retry_max)
            .field("check", &self.check.as_ref().map(|_| "custom"))
            .field("backoff", &self.backoff.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl<T, E> Policy<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_max(mut self, retry_max: u32) -> Self {
        self.retry_max = retry_max;
        self
    }

    pub fn with_wait(mut self, min: Duration, max: Duration) -> Self {
        self.wait_min = min;
        self.wait_max = max;
        self
    }

    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Result<T, E>) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }

    pub fn with_backoff<F>(mut self, backoff: F) -> Self
    where
        F: Fn(Duration, Duration, u32) -> Duration + Send + Sync + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Applies the configured predicate, or [`default_check`] when none is set.
    pub fn should_retry(&self, outcome: &Result<T, E>) -> Result<bool, BoxError> {
        match &self.check {
            Some(check) => check(outcome),
            None => default_check(outcome),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Some(backoff) => backoff(self.wait_min, self.wait_max, attempt),
            None => exponential_backoff(self.wait_min, self.wait_max, attempt),
        }
    }
}

//! Retry loop: run a callback until the policy says stop.

use super::error::RetryError;
use super::policy::Policy;
use crate::cancel::CancelToken;

/// Result of a retry run.
#[derive(Debug)]
pub struct Outcome<T, E> {
    /// Retries performed; the first attempt is retry 0. Never exceeds `retry_max`.
    pub retries: u32,
    /// Last attempt's value, or why the run ended without one.
    pub result: Result<T, RetryError<E>>,
}

impl<T, E> Outcome<T, E> {
    /// Total number of callback invocations (`retries + 1`).
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl<T, E> Policy<T, E> {
    /// Runs `callback` with this policy.
    ///
    /// The callback receives `retrying = false` on the first call and `true`
    /// afterwards. It always runs at least once. The run stops when the predicate
    /// says so, when `retry_max` retries have been performed, when the predicate
    /// fails (its error wins), or when `token` is cancelled during a backoff wait
    /// (the cancellation wins over the callback's error).
    pub fn run<F>(&self, token: &CancelToken, mut callback: F) -> Outcome<T, E>
    where
        F: FnMut(bool) -> Result<T, E>,
    {
        self.run_with_previous(token, |previous| callback(previous.is_some()))
    }

    /// Same as [`run`](Self::run), but hands the previous attempt's outcome to
    /// the callback on every retry (`None` on the first call), so it can release
    /// resources held by it before trying again.
    pub fn run_with_previous<F>(&self, token: &CancelToken, mut callback: F) -> Outcome<T, E>
    where
        F: FnMut(Option<Result<T, E>>) -> Result<T, E>,
    {
        let mut retries = 0u32;
        let mut previous = None;
        loop {
            let outcome = callback(previous.take());

            let proceed = match self.should_retry(&outcome) {
                Ok(proceed) => proceed,
                Err(e) => {
                    return Outcome {
                        retries,
                        result: Err(RetryError::Check(e)),
                    }
                }
            };

            if !proceed || retries >= self.retry_max {
                return Outcome {
                    retries,
                    result: outcome.map_err(RetryError::Operation),
                };
            }

            if let Err(c) = token.sleep(self.delay(retries)) {
                return Outcome {
                    retries,
                    result: Err(RetryError::Cancelled(c)),
                };
            }

            previous = Some(outcome);
            retries += 1;
        }
    }
}

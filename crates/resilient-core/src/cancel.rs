//! Cooperative cancellation: shared cancel tokens with an optional deadline.
//!
//! A `CancelToken` is handed to the retry engine and (through request
//! extensions) to HTTP transports. The only blocking point of the engine, the
//! backoff wait, goes through [`CancelToken::sleep`], which wakes up as soon as
//! the token is cancelled or its deadline passes.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Why a token stopped an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    /// `cancel()` was called on the token (or one of its clones).
    #[error("operation cancelled")]
    ByCaller,
    /// The token's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

struct Shared {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cloneable cancellation handle. Clones share state: cancelling one cancels all.
#[derive(Clone)]
pub struct CancelToken {
    shared: Arc<Shared>,
    deadline: Option<Instant>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl CancelToken {
    /// Token that only stops when `cancel()` is called.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                cancelled: Mutex::new(false),
                wake: Condvar::new(),
            }),
            deadline: None,
        }
    }

    /// Token that also expires once `deadline` is reached.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    /// Token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Request cancellation. Idempotent; wakes every thread blocked in [`sleep`](Self::sleep).
    pub fn cancel(&self) {
        let mut cancelled = self
            .shared
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.shared.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Returns why the token is done, or `None` while it is still live.
    /// Explicit cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<Cancelled> {
        let cancelled = *self
            .shared
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.check(cancelled, Instant::now())
    }

    fn check(&self, cancelled: bool, now: Instant) -> Option<Cancelled> {
        if cancelled {
            return Some(Cancelled::ByCaller);
        }
        match self.deadline {
            Some(deadline) if now >= deadline => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    /// Blocks the current thread for `wait`, or until the token is cancelled or
    /// expires, whichever comes first. An already-done token returns `Err`
    /// without waiting, even for a zero `wait`.
    pub fn sleep(&self, wait: Duration) -> Result<(), Cancelled> {
        let start = Instant::now();
        let wake_at = start.checked_add(wait);
        let mut cancelled = self
            .shared
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            let now = Instant::now();
            if let Some(reason) = self.check(*cancelled, now) {
                return Err(reason);
            }
            let until = match (wake_at, self.deadline) {
                (Some(w), Some(d)) => Some(w.min(d)),
                (Some(w), None) => Some(w),
                (None, d) => d,
            };
            match until {
                Some(until) if now >= until => {
                    // Deadline and wake-up may coincide; the deadline is checked first above.
                    return Ok(());
                }
                Some(until) => {
                    let (guard, _) = self
                        .shared
                        .wake
                        .wait_timeout(cancelled, until - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    cancelled = guard;
                }
                None => {
                    cancelled = self
                        .shared
                        .wake
                        .wait(cancelled)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_token_is_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.err(), None);
        assert!(token.sleep(Duration::ZERO).is_ok());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        clone.cancel();
        assert_eq!(token.err(), Some(Cancelled::ByCaller));
    }

    #[test]
    fn cancelled_token_fails_zero_sleep() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(token.sleep(Duration::ZERO), Err(Cancelled::ByCaller));
    }

    #[test]
    fn sleep_waits_for_duration() {
        let token = CancelToken::new();
        let start = Instant::now();
        token.sleep(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });
        let start = Instant::now();
        let res = token.sleep(Duration::from_secs(60));
        handle.join().unwrap();
        assert_eq!(res, Err(Cancelled::ByCaller));
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn deadline_cuts_sleep_short() {
        let token = CancelToken::with_timeout(Duration::from_millis(20));
        let start = Instant::now();
        assert_eq!(
            token.sleep(Duration::from_secs(60)),
            Err(Cancelled::DeadlineExceeded)
        );
        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(token.err(), Some(Cancelled::DeadlineExceeded));
    }

    #[test]
    fn explicit_cancel_wins_over_deadline() {
        let token = CancelToken::with_deadline(Instant::now());
        token.cancel();
        assert_eq!(token.err(), Some(Cancelled::ByCaller));
    }
}

//! Retry and backoff policy.
//!
//! A [`Policy`] drives an attempt loop around any fallible callback: run it,
//! ask the predicate whether to go again, wait for the backoff delay (racing a
//! [`CancelToken`](crate::cancel::CancelToken)), repeat. The engine does not
//! log; every failure comes back to the caller in the [`Outcome`].

mod backoff;
mod check;
mod error;
mod policy;
mod run;

pub use backoff::{exponential_backoff, Backoff};
pub use check::{default_check, BoxError, Check};
pub use error::RetryError;
pub use policy::Policy;
pub use run::Outcome;

//! Error returned by a retry run.

use super::check::BoxError;
use crate::cancel::Cancelled;

/// Why a retry run ended without a value.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The operation's own error from the last attempt (non-retryable, or the
    /// retry budget ran out).
    #[error(transparent)]
    Operation(E),
    /// The predicate itself failed; the run was aborted.
    #[error(transparent)]
    Check(BoxError),
    /// The token was cancelled or expired while waiting between attempts.
    #[error(transparent)]
    Cancelled(Cancelled),
}

impl<E> RetryError<E> {
    /// The operation's error, if that is what ended the run.
    pub fn operation(&self) -> Option<&E> {
        match self {
            RetryError::Operation(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            _ => None,
        }
    }

    pub fn cancelled(&self) -> Option<Cancelled> {
        match self {
            RetryError::Cancelled(c) => Some(*c),
            _ => None,
        }
    }
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The underlying error itself (not its source), for cause matching.
    pub fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            RetryError::Operation(e) => e,
            RetryError::Check(e) => e.as_ref(),
            RetryError::Cancelled(c) => c,
        }
    }
}

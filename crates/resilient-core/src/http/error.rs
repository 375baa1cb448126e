//! Transport errors and the composite error of an exhausted retrying request.

use std::fmt;
use std::io;

use crate::cancel::Cancelled;
use crate::retry::{BoxError, RetryError};

/// Error returned by a [`RoundTrip`](super::RoundTrip) implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Redirect limit exhausted.
    #[error("stopped after {0} redirects")]
    TooManyRedirects(u32),
    /// The URL scheme is not one the transport can speak.
    #[error("unsupported protocol scheme {0:?}")]
    UnsupportedScheme(String),
    /// The peer certificate could not be verified (unknown authority, bad chain).
    #[error("certificate verification failed: {0}")]
    Tls(#[source] curl::Error),
    /// The request's cancel token fired.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The response body exceeded the transport's buffer limit.
    #[error("response body larger than {0} bytes")]
    ResponseTooLarge(u64),
    /// The server closed the connection without sending a status line.
    #[error("server closed the connection without a response")]
    NoResponse,
    /// The body must be sent again but the request has no [`GetBody`](super::GetBody).
    #[error("request body cannot be replayed: no GetBody set")]
    MissingReplay,
    /// The [`GetBody`](super::GetBody) function failed.
    #[error("rewinding body: {0}")]
    Rewind(#[source] io::Error),
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error(transparent)]
    Http(#[from] http::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A retrying transport gave up.
    #[error(transparent)]
    Attempts(Box<RequestError>),
    /// Opaque error from a custom transport.
    #[error(transparent)]
    Other(BoxError),
}

impl TransportError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        TransportError::Other(err.into())
    }
}

impl From<RequestError> for TransportError {
    fn from(err: RequestError) -> Self {
        TransportError::Attempts(Box::new(err))
    }
}

/// Error of a retrying request: the total attempt count plus the cause.
///
/// Displays as `request attempt N: <cause>`. [`source`](std::error::Error::source)
/// returns the original cause itself, so callers can downcast it.
#[derive(Debug)]
pub struct RequestError {
    attempts: u32,
    cause: RetryError<TransportError>,
}

impl RequestError {
    pub fn new(attempts: u32, cause: RetryError<TransportError>) -> Self {
        Self { attempts, cause }
    }

    /// Total attempts made, the first one included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn cause(&self) -> &RetryError<TransportError> {
        &self.cause
    }

    pub fn into_cause(self) -> RetryError<TransportError> {
        self.cause
    }

    /// The transport error of the last attempt, when that is what ended the run.
    pub fn transport_error(&self) -> Option<&TransportError> {
        self.cause.operation()
    }

    /// True when the cause is, or downcasts to, `T`.
    pub fn is<T: std::error::Error + 'static>(&self) -> bool {
        self.cause.as_error().is::<T>()
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request attempt {}: {}", self.attempts, self.cause)
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_error())
    }
}

//! HTTP round trips with retries.
//!
//! [`RoundTrip`] is the one capability every transport provides: send a
//! request, get a response or an error. [`RetryTransport`] decorates any
//! transport with a retry [`Policy`](crate::retry::Policy) and is itself a
//! `RoundTrip`, so it composes transparently. [`CurlTransport`] is the libcurl
//! backed transport used by default, and [`Client`] is a small convenience
//! front end.

mod body;
mod classify;
mod client;
mod curl_transport;
mod error;
mod transport;

use std::sync::Arc;

use ::http::{Request, Response};

use crate::cancel::CancelToken;

pub use body::{new_request, Body, GetBody};
pub use classify::{http_check, is_permanent_error, is_retryable_status};
pub use client::{new_http_client, Client};
pub use curl_transport::{CurlOptions, CurlTransport, DEFAULT_MAX_RESPONSE_BYTES};
pub use error::{RequestError, TransportError};
pub use transport::{HttpPolicy, RetryTransport, DRAIN_LIMIT};

/// Sends one request and returns the response.
///
/// Implementations may consume the request body (leaving it empty) but must not
/// otherwise modify the request. They must be safe to call from several threads.
pub trait RoundTrip: Send + Sync {
    fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError>;

    /// Closes connections kept alive for reuse. No-op for transports without a pool.
    fn close_idle_connections(&self) {}
}

impl<T: RoundTrip + ?Sized> RoundTrip for &T {
    fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError> {
        (**self).round_trip(req)
    }

    fn close_idle_connections(&self) {
        (**self).close_idle_connections()
    }
}

impl<T: RoundTrip + ?Sized> RoundTrip for Box<T> {
    fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError> {
        (**self).round_trip(req)
    }

    fn close_idle_connections(&self) {
        (**self).close_idle_connections()
    }
}

impl<T: RoundTrip + ?Sized> RoundTrip for Arc<T> {
    fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError> {
        (**self).round_trip(req)
    }

    fn close_idle_connections(&self) {
        (**self).close_idle_connections()
    }
}

/// The cancel token attached to `req`, or a fresh one that never fires.
pub fn cancel_token<B>(req: &Request<B>) -> CancelToken {
    req.extensions()
        .get::<CancelToken>()
        .cloned()
        .unwrap_or_default()
}

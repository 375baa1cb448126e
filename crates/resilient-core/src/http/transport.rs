//! Retrying transport: applies a retry policy to every round trip.

use std::sync::Arc;

use http::{Request, Response};

use super::body::{Body, GetBody};
use super::classify::http_check;
use super::error::{RequestError, TransportError};
use super::RoundTrip;
use crate::retry::{Check, Policy};

/// Bytes read from an abandoned response before closing it, so the connection
/// can go back to the pool instead of being torn down.
pub const DRAIN_LIMIT: u64 = 4096;

/// Policy type driving HTTP round trips.
pub type HttpPolicy = Policy<Response<Body>, TransportError>;

/// Wraps a transport and retries requests according to a [`Policy`].
///
/// Holds no per-request state: concurrent calls each run their own attempt
/// loop against the shared inner transport.
#[derive(Debug)]
pub struct RetryTransport<R> {
    inner: R,
    policy: HttpPolicy,
}

impl<R: RoundTrip> RetryTransport<R> {
    /// Decorates `inner`. A policy without a predicate gets [`http_check`].
    pub fn new(inner: R, mut policy: HttpPolicy) -> Self {
        if policy.check.is_none() {
            let check: Check<Response<Body>, TransportError> = Arc::new(http_check);
            policy.check = Some(check);
        }
        Self { inner, policy }
    }

    pub fn policy(&self) -> &HttpPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: RoundTrip> RoundTrip for RetryTransport<R> {
    /// Sends `req`, retrying per the policy.
    ///
    /// Before each retry the previous response body is drained (up to
    /// [`DRAIN_LIMIT`]) and closed, and a non-empty request body is replaced with
    /// a fresh copy from the request's [`GetBody`]. A missing `GetBody` fails the
    /// attempt with [`TransportError::MissingReplay`]. When the run ends in an
    /// error it comes back as [`TransportError::Attempts`] carrying the total
    /// attempt count. Idle connections of the inner transport are closed once per
    /// call, whatever the outcome.
    fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError> {
        let _idle = CloseIdleOnDrop(&self.inner);

        let token = super::cancel_token(req);
        let needs_replay = !req.body().is_empty();
        let get_body = req.extensions().get::<GetBody>().cloned();
        let inner = &self.inner;
        let mut attempt = 1u32;

        let outcome = self.policy.run_with_previous(&token, |previous| {
            if let Some(previous) = previous {
                attempt += 1;
                if let Ok(mut resp) = previous {
                    if let Err(e) = resp.body_mut().drain(DRAIN_LIMIT) {
                        tracing::debug!("draining response before retry failed: {}", e);
                    }
                }
                if needs_replay {
                    let get_body = get_body.as_ref().ok_or(TransportError::MissingReplay)?;
                    *req.body_mut() = get_body.get().map_err(TransportError::Rewind)?;
                }
                tracing::debug!(
                    attempt,
                    method = %req.method(),
                    uri = %req.uri(),
                    "retrying request"
                );
            }
            inner.round_trip(req)
        });

        let attempts = outcome.attempts();
        outcome
            .result
            .map_err(|cause| RequestError::new(attempts, cause).into())
    }

    fn close_idle_connections(&self) {
        self.inner.close_idle_connections();
    }
}

struct CloseIdleOnDrop<'a, R: RoundTrip>(&'a R);

impl<R: RoundTrip> Drop for CloseIdleOnDrop<'_, R> {
    fn drop(&mut self) {
        self.0.close_idle_connections();
    }
}

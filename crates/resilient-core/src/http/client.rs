//! Convenience client over any [`RoundTrip`] transport.

use http::{Method, Request, Response};

use super::body::{new_request, Body};
use super::curl_transport::CurlTransport;
use super::error::TransportError;
use super::transport::{HttpPolicy, RetryTransport};
use super::RoundTrip;
use crate::cancel::CancelToken;

/// Thin request front end. The transport decides how requests travel;
/// wrap it with [`with_policy`](Client::with_policy) to get retries.
#[derive(Debug)]
pub struct Client<R = CurlTransport> {
    transport: R,
}

impl Client<CurlTransport> {
    /// Client over a default [`CurlTransport`], without retries.
    pub fn new() -> Self {
        Self::with_transport(CurlTransport::default())
    }
}

impl Default for Client<CurlTransport> {
    fn default() -> Self {
        Self::new()
    }
}

/// Client over libcurl whose requests are retried with `policy`.
/// Without a predicate in `policy`, [`http_check`](super::http_check) is used.
pub fn new_http_client(policy: HttpPolicy) -> Client<RetryTransport<CurlTransport>> {
    Client::new().with_policy(policy)
}

impl<R: RoundTrip> Client<R> {
    pub fn with_transport(transport: R) -> Self {
        Self { transport }
    }

    /// Same client with its transport decorated by a [`RetryTransport`].
    pub fn with_policy(self, policy: HttpPolicy) -> Client<RetryTransport<R>> {
        Client {
            transport: RetryTransport::new(self.transport, policy),
        }
    }

    pub fn transport(&self) -> &R {
        &self.transport
    }

    pub fn send(&self, mut req: Request<Body>) -> Result<Response<Body>, TransportError> {
        self.transport.round_trip(&mut req)
    }

    /// Sends `req` bound to `token`: cancelling it aborts transfers and backoff waits.
    pub fn send_with_token(
        &self,
        mut req: Request<Body>,
        token: CancelToken,
    ) -> Result<Response<Body>, TransportError> {
        req.extensions_mut().insert(token);
        self.send(req)
    }

    pub fn get(&self, uri: &str) -> Result<Response<Body>, TransportError> {
        let req = Request::get(uri).body(Body::empty())?;
        self.send(req)
    }

    /// POSTs an in-memory body; the body is replayable, so retries can resend it.
    pub fn post(
        &self,
        uri: &str,
        body: impl Into<Vec<u8>>,
    ) -> Result<Response<Body>, TransportError> {
        let req = new_request(Method::POST, uri, body)?;
        self.send(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails every odd trip with 503, echoes method and body on even trips.
    #[derive(Default)]
    struct FlakyEcho {
        trips: AtomicU32,
    }

    impl RoundTrip for FlakyEcho {
        fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError> {
            let trip = self.trips.fetch_add(1, Ordering::SeqCst) + 1;
            let mut body = Vec::new();
            req.body_mut().read_to_end(&mut body)?;
            let status: u16 = if trip % 2 == 1 { 503 } else { 200 };
            let mut echo = req.method().as_str().as_bytes().to_vec();
            echo.push(b' ');
            echo.extend(body);
            Ok(Response::builder().status(status).body(Body::from(echo))?)
        }
    }

    fn policy() -> HttpPolicy {
        HttpPolicy::new()
            .with_retry_max(3)
            .with_wait(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn new_http_client_uses_http_check() {
        let client = new_http_client(HttpPolicy::new());
        assert!(client.transport().policy().check.is_some());
    }

    #[test]
    fn plain_client_does_not_retry() {
        let client = Client::with_transport(FlakyEcho::default());
        let resp = client.get("http://localhost/").unwrap();
        assert_eq!(resp.status(), 503);
    }

    #[test]
    fn with_policy_retries_get() {
        let client = Client::with_transport(FlakyEcho::default()).with_policy(policy());
        let resp = client.get("http://localhost/").unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.into_body().into_bytes().unwrap(), b"GET ");
        assert_eq!(client.transport().inner().trips.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn post_body_survives_retry() {
        let client = Client::with_transport(FlakyEcho::default()).with_policy(policy());
        let resp = client.post("http://localhost/", "hello").unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.into_body().into_bytes().unwrap(), b"POST hello");
    }

    #[test]
    fn invalid_uri_is_reported() {
        let client = Client::with_transport(FlakyEcho::default());
        assert!(matches!(
            client.get("http://exa mple.com/"),
            Err(TransportError::Http(_))
        ));
    }
}

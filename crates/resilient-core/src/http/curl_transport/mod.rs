//! libcurl-backed transport.
//!
//! Runs each request on a curl easy handle in the calling thread. Finished
//! handles are kept in a small idle list so the next request can reuse their
//! keep-alive connections; [`RoundTrip::close_idle_connections`] drops them.

mod parse;

use std::fmt;
use std::io::Read;
use std::str;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use curl::easy::{Easy, List, ReadError};
use http::header::{HeaderMap, CONTENT_TYPE, EXPECT};
use http::{Method, Request, Response};

use super::body::Body;
use super::error::TransportError;
use super::RoundTrip;
use crate::cancel::CancelToken;

/// Easy handles kept around for reuse.
const MAX_IDLE_HANDLES: usize = 8;

/// Default cap on a buffered response body (64 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Per-transport curl settings.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Whole-request timeout (connect + transfer). Zero disables it.
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirections: u32,
    /// Response bodies are buffered in memory; a larger body fails the request
    /// with [`TransportError::ResponseTooLarge`].
    pub max_response_bytes: u64,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            follow_redirects: true,
            max_redirections: 10,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// Request headers in libcurl's list syntax.
///
/// libcurl drops `Name:` with nothing after the colon, so empty values are
/// written as `Name;`. Headers libcurl would add on its own are blanked out
/// (`Name:`) unless the request sets them: `Content-Type` for POST (libcurl
/// claims form encoding) and `Expect` when a body is sent.
fn header_lines(headers: &HeaderMap, method: &Method, send_body: bool) -> Vec<String> {
    let mut lines: Vec<String> = headers
        .iter()
        .map(|(name, value)| {
            if value.is_empty() {
                format!("{};", name)
            } else {
                format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()))
            }
        })
        .collect();
    if method == Method::POST && !headers.contains_key(CONTENT_TYPE) {
        lines.push("Content-Type:".to_string());
    }
    if send_body && !headers.contains_key(EXPECT) {
        lines.push("Expect:".to_string());
    }
    lines
}

/// [`RoundTrip`] over libcurl. Safe to share between threads.
pub struct CurlTransport {
    options: CurlOptions,
    idle: Mutex<Vec<Easy>>,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(CurlOptions::default())
    }
}

impl fmt::Debug for CurlTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurlTransport")
            .field("options", &self.options)
            .field("idle_handles", &self.idle_handles())
            .finish()
    }
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self {
            options,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }

    /// Number of easy handles (and their connections) waiting for reuse.
    pub fn idle_handles(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn checkout(&self) -> Easy {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(Easy::new)
    }

    fn checkin(&self, mut easy: Easy) {
        // reset() clears options but keeps the connection cache.
        easy.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE_HANDLES {
            idle.push(easy);
        }
    }

    fn perform(
        &self,
        easy: &mut Easy,
        req: &mut Request<Body>,
        token: &CancelToken,
    ) -> Result<Response<Body>, TransportError> {
        easy.url(&req.uri().to_string())?;
        easy.follow_location(self.options.follow_redirects)?;
        easy.max_redirections(self.options.max_redirections)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.timeout)?;
        easy.progress(true)?;

        let mut body = std::mem::take(req.body_mut());
        let mut send_body = false;
        let method = req.method();
        if method == Method::GET {
            easy.get(true)?;
        } else if method == Method::HEAD {
            easy.nobody(true)?;
        } else if method == Method::POST {
            easy.post(true)?;
            if let Some(len) = body.content_length() {
                easy.post_field_size(len)?;
            }
            send_body = !body.is_empty();
        } else {
            if !body.is_empty() {
                easy.upload(true)?;
                if let Some(len) = body.content_length() {
                    easy.in_filesize(len)?;
                }
                send_body = true;
            }
            easy.custom_request(method.as_str())?;
        }

        let lines = header_lines(req.headers(), method, send_body);
        if !lines.is_empty() {
            let mut list = List::new();
            for line in &lines {
                list.append(line)?;
            }
            easy.http_headers(list)?;
        }

        let limit = self.options.max_response_bytes;
        let mut too_large = false;
        let mut received: Vec<String> = Vec::new();
        let mut data: Vec<u8> = Vec::new();
        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                if let Ok(s) = str::from_utf8(line) {
                    received.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|chunk| {
                if data.len() as u64 + chunk.len() as u64 > limit {
                    too_large = true;
                    // A short count makes libcurl abort with a write error.
                    return Ok(0);
                }
                data.extend_from_slice(chunk);
                Ok(chunk.len())
            })?;
            if send_body {
                transfer.read_function(|buf| body.read(buf).map_err(|_| ReadError::Abort))?;
            }
            // Returning false aborts the transfer.
            transfer.progress_function(|_, _, _, _| !token.is_cancelled())?;
            transfer.perform()
        };
        if let Err(e) = performed {
            if too_large {
                return Err(TransportError::ResponseTooLarge(limit));
            }
            return Err(self.map_error(e, token));
        }

        let code = easy.response_code()?;
        if code == 0 {
            return Err(TransportError::NoResponse);
        }
        let status = u16::try_from(code).map_err(|_| TransportError::NoResponse)?;

        let mut resp = Response::builder()
            .status(status)
            .version(parse::parse_version(&received))
            .body(Body::from(data))?;
        *resp.headers_mut() = parse::parse_headers(&received);
        Ok(resp)
    }

    fn map_error(&self, e: curl::Error, token: &CancelToken) -> TransportError {
        if e.is_aborted_by_callback() {
            if let Some(reason) = token.err() {
                return reason.into();
            }
        }
        if e.is_too_many_redirects() {
            return TransportError::TooManyRedirects(self.options.max_redirections);
        }
        if e.is_peer_failed_verification() || e.is_ssl_cacert() {
            return TransportError::Tls(e);
        }
        if e.is_got_nothing() {
            return TransportError::NoResponse;
        }
        TransportError::Curl(e)
    }
}

impl RoundTrip for CurlTransport {
    fn round_trip(&self, req: &mut Request<Body>) -> Result<Response<Body>, TransportError> {
        let scheme = req.uri().scheme_str().unwrap_or_default();
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(TransportError::UnsupportedScheme(scheme.to_string()));
        }

        let token = super::cancel_token(req);
        if let Some(reason) = token.err() {
            return Err(reason.into());
        }

        let mut easy = self.checkout();
        let result = self.perform(&mut easy, req, &token);
        match &result {
            Ok(resp) => tracing::debug!(
                method = %req.method(),
                uri = %req.uri(),
                status = resp.status().as_u16(),
                "round trip complete"
            ),
            Err(e) => tracing::debug!(
                method = %req.method(),
                uri = %req.uri(),
                "round trip failed: {}",
                e
            ),
        }
        self.checkin(easy);
        result
    }

    fn close_idle_connections(&self) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

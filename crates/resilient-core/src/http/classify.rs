//! Classify HTTP responses and transport errors for retry decisions.

use std::sync::LazyLock;

use http::{Response, StatusCode};
use regex::Regex;

use super::body::Body;
use super::error::TransportError;
use crate::cancel::Cancelled;
use crate::retry::BoxError;

static REDIRECTS_EXHAUSTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"stopped after \d+ redirects\z").expect("redirect regex is valid"));
static UNSUPPORTED_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"unsupported protocol scheme").expect("scheme regex is valid"));

/// Retry predicate for HTTP round trips.
///
/// Retries connection-level failures and transient server answers (5xx except
/// 501, 408, 429). Never returns `Err`.
pub fn http_check(outcome: &Result<Response<Body>, TransportError>) -> Result<bool, BoxError> {
    Ok(match outcome {
        Err(e) => !is_permanent_error(e),
        Ok(resp) => is_retryable_status(resp.status()),
    })
}

/// Status codes worth another attempt. 501 Not Implemented is permanent.
pub fn is_retryable_status(status: StatusCode) -> bool {
    let code = status.as_u16();
    if code >= 500 && code != 501 {
        return true;
    }
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
    )
}

/// Errors that another attempt cannot fix: redirect loops, bad schemes, TLS
/// trust failures, cancellation, oversized responses and body replay problems.
pub fn is_permanent_error(err: &TransportError) -> bool {
    match err {
        TransportError::TooManyRedirects(_)
        | TransportError::UnsupportedScheme(_)
        | TransportError::Tls(_)
        | TransportError::Cancelled(_)
        | TransportError::ResponseTooLarge(_)
        | TransportError::MissingReplay
        | TransportError::Rewind(_) => true,
        // The inner retrying transport already spent its budget.
        TransportError::Attempts(_) => true,
        TransportError::Curl(e) => {
            e.is_too_many_redirects()
                || e.is_unsupported_protocol()
                || e.is_peer_failed_verification()
                || e.is_ssl_cacert()
        }
        TransportError::Other(e) => {
            if e.downcast_ref::<Cancelled>().is_some() {
                return true;
            }
            let msg = e.to_string();
            REDIRECTS_EXHAUSTED.is_match(&msg) || UNSUPPORTED_SCHEME.is_match(&msg)
        }
        TransportError::NoResponse | TransportError::Http(_) | TransportError::Io(_) => false,
    }
}

//! `resilient request <url>` – send one request through the retrying client.

use anyhow::{anyhow, bail, Context, Result};
use http::header::{HeaderName, HeaderValue};
use http::{Method, Request};
use resilient_core::cancel::CancelToken;
use resilient_core::config::ResilientConfig;
use resilient_core::http::{new_request, Body, Client, CurlTransport, HttpPolicy};
use std::io::{self, Write};
use std::time::Duration;

use crate::cli::RetryArgs;

#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub url: String,
    pub method: Option<String>,
    pub data: Option<String>,
    pub headers: Vec<String>,
    pub include: bool,
    pub timeout: Option<f64>,
    pub retry: RetryArgs,
}

/// GET unless given, POST when there is a body.
fn effective_method(args: &RequestArgs) -> Result<Method> {
    match &args.method {
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| anyhow!("invalid method: {}", m)),
        None if args.data.is_some() => Ok(Method::POST),
        None => Ok(Method::GET),
    }
}

/// Parses `Name: value`.
fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("header must look like 'Name: value', got {:?}", raw))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in {:?}", raw))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in {:?}", raw))?;
    Ok((name, value))
}

/// Request with the given body and `-H` headers; headers are sent as typed,
/// empty values included.
fn build_request(args: &RequestArgs) -> Result<Request<Body>> {
    let method = effective_method(args)?;
    let body = args.data.clone().unwrap_or_default();
    let mut req = new_request(method, args.url.as_str(), body)
        .with_context(|| format!("invalid request for {}", args.url))?;
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        req.headers_mut().append(name, value);
    }
    Ok(req)
}

fn cancel_token(timeout: Option<f64>) -> Result<CancelToken> {
    match timeout {
        Some(secs) => {
            let timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("--timeout must be a non-negative number, got {}", secs))?;
            Ok(CancelToken::with_timeout(timeout))
        }
        None => Ok(CancelToken::new()),
    }
}

pub async fn run_request(cfg: &ResilientConfig, args: RequestArgs) -> Result<()> {
    let policy: HttpPolicy = args.retry.apply(cfg.retry()).to_policy()?;
    let options = cfg.http().to_curl_options()?;
    let req = build_request(&args)?;
    let token = cancel_token(args.timeout)?;

    // Ctrl-C cancels the in-flight transfer or backoff wait.
    let watcher = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling request");
                token.cancel();
            }
        }
    });

    let client = Client::with_transport(CurlTransport::new(options)).with_policy(policy);
    tracing::info!(method = %req.method(), uri = %req.uri(), "sending request");
    let result = tokio::task::spawn_blocking(move || -> Result<_> {
        let resp = client.send_with_token(req, token)?;
        let (parts, body) = resp.into_parts();
        let bytes = body.into_bytes().context("reading response body")?;
        Ok((parts, bytes))
    })
    .await
    .context("request task join");
    watcher.abort();
    let (parts, bytes) = result??;

    let mut out = io::stdout().lock();
    if args.include {
        writeln!(out, "{:?} {}", parts.version, parts.status)?;
        for (name, value) in &parts.headers {
            writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
        }
        writeln!(out)?;
    }
    out.write_all(&bytes)?;
    out.flush()?;

    if parts.status.is_client_error() || parts.status.is_server_error() {
        bail!("server responded with {}", parts.status);
    }
    Ok(())
}

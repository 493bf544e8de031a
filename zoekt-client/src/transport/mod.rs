//! HTTP transport seam.
//!
//! A transport sends one prepared JSON request and hands back the raw status
//! and body. It never retries and never decodes; both are done by the client
//! pipeline so that the blocking and async variants behave identically.

pub mod reqwest_async;
pub mod reqwest_blocking;

use std::error::Error as _;
use std::future::Future;
use std::io;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::error_handler::{Result, TransportError, ZoektError};

pub use reqwest_async::HttpTransport;
pub use reqwest_blocking::BlockingHttpTransport;

/// Maximum number of body bytes kept in a service error.
pub const SNIPPET_LIMIT: usize = 240;

/// Zoekt JSON API endpoints used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    List,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Search => "/api/search",
            Self::List => "/api/list",
        }
    }
}

/// A fully prepared `POST` with a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub endpoint: Endpoint,
    pub url: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(base_url: &str, endpoint: Endpoint, body: Vec<u8>) -> Self {
        Self {
            endpoint,
            url: format!("{}{}", base_url.trim_end_matches('/'), endpoint.path()),
            body,
        }
    }
}

/// Status and body as received, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body of a 2xx response.
    ///
    /// # Errors
    /// Any other status becomes [`ZoektError::Service`] carrying the
    /// service's `{"Error": ...}` text when present and a body snippet.
    pub fn into_body(self, url: &str) -> Result<Vec<u8>> {
        if self.is_success() {
            return Ok(self.body);
        }
        let message = serde_json::from_slice::<ServiceErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());
        let end = self.body.len().min(SNIPPET_LIMIT);
        let snippet = String::from_utf8_lossy(&self.body[..end]).into_owned();
        Err(ZoektError::Service {
            status: self.status,
            url: url.to_string(),
            message,
            snippet,
        })
    }
}

/// Synchronous transport. A call blocks the calling thread.
pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse>;
}

/// Asynchronous transport. Dropping the returned future cancels the request.
pub trait AsyncTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// Maps a reqwest failure onto a [`TransportError`] class.
///
/// `timeout` is the per-attempt window the client was built with.
pub fn classify_reqwest_error(err: &reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout);
    }

    let detail = error_chain(err);
    let lower = detail.to_ascii_lowercase();
    if lower.contains("dns error") || lower.contains("failed to lookup address") {
        return TransportError::DnsFailure(detail);
    }
    if has_io_kind(err, io::ErrorKind::ConnectionRefused) || lower.contains("connection refused")
    {
        return TransportError::ConnectionRefused;
    }
    if has_io_kind(err, io::ErrorKind::TimedOut) {
        return TransportError::Timeout(timeout);
    }
    if err.is_connect() {
        return TransportError::Connect(detail);
    }
    TransportError::Other(detail)
}

fn has_io_kind(err: &reqwest::Error, kind: io::ErrorKind) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// `err: cause: cause` rendering of the whole source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

pub(crate) fn json_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    h
}

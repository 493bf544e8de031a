use std::time::Duration;

use tracing::debug;

use super::{AsyncTransport, HttpRequest, RawResponse, classify_reqwest_error, json_headers};
use crate::config::ClientConfig;
use crate::error_handler::{ConfigError, Result, ZoektError};

/// Async transport over a pooled [`reqwest::Client`].
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Builds the pooled client with the per-attempt timeout from `cfg`.
    ///
    /// # Errors
    /// Returns [`ConfigError::HttpClient`] when reqwest cannot build the client
    /// (e.g. TLS backend initialization failure).
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .default_headers(json_headers())
            .timeout(cfg.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            timeout: cfg.timeout,
        })
    }
}

impl AsyncTransport for HttpTransport {
    async fn send(&self, request: &HttpRequest) -> Result<RawResponse> {
        debug!(
            endpoint = request.endpoint.path(),
            url = %request.url,
            bytes = request.body.len(),
            "sending request"
        );

        let fail = |e: reqwest::Error| {
            ZoektError::transport(classify_reqwest_error(&e, self.timeout), request.url.as_str())
        };

        let resp = self
            .http
            .post(&request.url)
            .body(request.body.clone())
            .send()
            .await
            .map_err(fail)?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(fail)?;

        debug!(
            endpoint = request.endpoint.path(),
            status,
            bytes = body.len(),
            "received response"
        );
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

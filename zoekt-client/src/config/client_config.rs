use std::time::Duration;

use crate::error_handler::{ConfigError, Result};
use crate::retry::RetryPolicy;

/// Default Zoekt web server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default Zoekt web server port.
pub const DEFAULT_PORT: u16 = 6070;

/// Default per-attempt request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration of a single client instance.
///
/// The config is fixed for the lifetime of the client that owns it; build a
/// new client to change it.
///
/// # Fields
///
/// - `host`: server host name, or a full `http(s)://host` base without port.
/// - `port`: server port.
/// - `timeout`: per-attempt timeout; every retry gets a fresh window.
/// - `retry`: bounded retry with exponential backoff.
/// - `strict_line_matches`: reject a file whose `LineMatches` is present but empty.
/// - `user_agent`: value for the `User-Agent` header.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use zoekt_client::ClientConfig;
///
/// let cfg = ClientConfig::default()
///     .with_host("zoekt.internal")
///     .with_port(6080)
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(cfg.base_url(), "http://zoekt.internal:6080");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server host (e.g. `localhost`).
    pub host: String,

    /// Server port (e.g. `6070`).
    pub port: u16,

    /// Per-attempt request timeout.
    pub timeout: Duration,

    /// Retry policy for transient failures.
    pub retry: RetryPolicy,

    /// Treat a present-but-empty `LineMatches` list as a decode error.
    pub strict_line_matches: bool,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            strict_line_matches: true,
            user_agent: concat!("zoekt-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `host:port` with every other field defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_strict_line_matches(mut self, strict: bool) -> Self {
        self.strict_line_matches = strict;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Base URL without trailing slash, e.g. `http://localhost:6070`.
    ///
    /// A host that already carries a scheme keeps it.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }

    /// Validates config values.
    ///
    /// # Errors
    /// - [`ConfigError::Missing`] for an empty host
    /// - [`ConfigError::OutOfRange`] for a zero port, zero timeout or invalid retry bounds
    /// - [`ConfigError::InvalidFormat`] for a host containing a path or whitespace
    pub fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::Missing("host").into());
        }
        let bare = host
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/');
        if bare.is_empty() || bare.contains('/') || bare.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidFormat {
                var: "host",
                reason: "expected a bare host name, optionally with http:// or https://",
            }
            .into());
        }
        if self.port == 0 {
            return Err(ConfigError::OutOfRange {
                field: "port",
                detail: "expected 1..=65535",
            }
            .into());
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                field: "timeout",
                detail: "expected a non-zero duration",
            }
            .into());
        }
        self.retry.validate()
    }
}

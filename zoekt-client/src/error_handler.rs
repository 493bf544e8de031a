//! Unified error handling for `zoekt-client`.
//!
//! This module exposes a single top-level error type [`ZoektError`] for the whole
//! library and groups domain-specific errors in nested enums ([`TransportError`],
//! [`InvalidOptionError`], [`ConfigError`]). Small helpers for reading
//! environment variables are provided and return the unified [`Result<T>`] alias.
//!
//! All messages include the prefix `[Zoekt Client]` to simplify attribution in logs.

use std::time::Duration;

use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, ZoektError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `zoekt-client` crate.
///
/// Callers can match broadly on this type or narrowly on the nested kinds.
/// A `Service` error means the server was reached and refused the request; a
/// `Transport` error means the server could not be reached at all.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ZoektError {
    /// The caller built options the service cannot accept.
    #[error(transparent)]
    InvalidOption(#[from] InvalidOptionError),

    /// Network-level failure (no HTTP status available).
    #[error("[Zoekt Client] could not reach service at {url}: {kind}")]
    Transport {
        /// Classified network failure.
        kind: TransportError,
        /// Request URL.
        url: String,
    },

    /// The service answered with a non-successful HTTP status.
    #[error("[Zoekt Client] service returned HTTP {status} from {url}: {}", service_detail(.message, .snippet))]
    Service {
        /// Numeric HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// Error text reported by Zoekt in `{"Error": "..."}`, when present.
        message: Option<String>,
        /// First bytes of the response body (lossy UTF-8).
        snippet: String,
    },

    /// A successful response could not be decoded into the result model.
    #[error("[Zoekt Client] decode error: {0}")]
    Decode(String),

    /// The client was closed before the call was issued.
    #[error("[Zoekt Client] client is closed")]
    ClientClosed,

    /// Configuration/validation errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ZoektError {
    /// Whether reissuing the identical request may succeed.
    ///
    /// Only connection-level transport failures and 5xx service errors are
    /// transient. Client errors, decode failures and caller mistakes are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { kind, .. } => kind.is_retryable(),
            Self::Service { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// HTTP status for service errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` when the service was reachable but rejected the request.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    /// `true` when the service could not be reached.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Classified network failure, if this is a transport error.
    pub fn transport_kind(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub(crate) fn transport(kind: TransportError, url: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            url: url.into(),
        }
    }

    pub(crate) fn decode(detail: impl std::fmt::Display) -> Self {
        Self::Decode(detail.to_string())
    }
}

fn service_detail<'a>(message: &'a Option<String>, snippet: &'a str) -> &'a str {
    message.as_deref().unwrap_or(snippet)
}

/* ------------------------------------------------------------------------- */
/* Transport errors                                                          */
/* ------------------------------------------------------------------------- */

/// Network failure classes, distinguished so the retry policy can decide.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt exceeded its timeout window.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The host actively refused the TCP connection.
    #[error("connection refused")]
    ConnectionRefused,

    /// The host name could not be resolved.
    #[error("dns resolution failed: {0}")]
    DnsFailure(String),

    /// Connection could not be established for another reason (reset, unreachable).
    #[error("connect error: {0}")]
    Connect(String),

    /// Any other failure while sending or reading the response.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Timeouts and connection failures are transient; DNS and others are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::ConnectionRefused | Self::Connect(_)
        )
    }
}

/* ------------------------------------------------------------------------- */
/* Option errors                                                             */
/* ------------------------------------------------------------------------- */

/// Rejected search options.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidOptionError {
    /// Query string was empty after trimming.
    #[error("[Zoekt Client] query must not be empty")]
    EmptyQuery,

    /// A numeric option was outside its allowed range.
    #[error("[Zoekt Client] option {key} is out of range: {detail}")]
    OutOfRange {
        /// Wire key (e.g. `NumContextLines`).
        key: String,
        /// Description of the expected range.
        detail: &'static str,
    },

    /// An option had the wrong JSON type.
    #[error("[Zoekt Client] option {key} must be {expected}")]
    WrongType {
        /// Wire key.
        key: String,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// A filter value (language, file, repo) was empty.
    #[error("[Zoekt Client] {0} filter must not be empty")]
    EmptyFilter(&'static str),
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required value is missing or empty.
    #[error("[Zoekt Client] missing required value: {0}")]
    Missing(&'static str),

    /// A number failed to parse (ports, limits, timeouts).
    #[error("[Zoekt Client] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g. `ZOEKT_PORT`).
        var: &'static str,
        /// Human-readable reason (e.g. `expected u16`).
        reason: &'static str,
    },

    /// Value had the wrong format.
    #[error("[Zoekt Client] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable or field name.
        var: &'static str,
        /// Explanation.
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[Zoekt Client] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g. `max_attempts`).
        field: &'static str,
        /// Description of the expected range.
        detail: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("[Zoekt Client] failed to build HTTP client: {0}")]
    HttpClient(String),
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Reads an optional, non-empty environment variable.
pub fn env_opt(name: &'static str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Parses an optional number from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ZoektError::Config`] with [`ConfigError::InvalidNumber`] if the
/// variable is set but does not parse as `T`.
pub fn env_opt_parse<T>(name: &'static str, reason: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match env_opt(name) {
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var: name, reason }.into()),
        None => Ok(None),
    }
}

/// Parses an optional boolean flag from env (`1/0`, `true/false`, `yes/no`).
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] for any other value.
pub fn env_opt_bool(name: &'static str) -> Result<Option<bool>> {
    match env_opt(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidFormat {
                var: name,
                reason: "expected a boolean (true/false, 1/0, yes/no)",
            }
            .into()),
        },
    }
}

//! Client config loaded from environment variables.
//!
//! Every variable is optional; unset or empty values keep the defaults of
//! [`ClientConfig::default`]. Set-but-malformed values are errors rather than
//! silently ignored.
//!
//! # Environment variables
//!
//! - `ZOEKT_HOST`                 = server host (default `localhost`)
//! - `ZOEKT_PORT`                 = server port, u16 (default `6070`)
//! - `ZOEKT_TIMEOUT_SECS`         = per-attempt timeout in seconds (default `10`)
//! - `ZOEKT_MAX_ATTEMPTS`         = total attempts per call (default `3`)
//! - `ZOEKT_RETRY_BASE_DELAY_MS`  = first backoff delay (default `500`)
//! - `ZOEKT_RETRY_MAX_DELAY_MS`   = backoff cap (default `10000`)
//! - `ZOEKT_STRICT_LINE_MATCHES`  = reject empty `LineMatches` (default `true`)

use std::time::Duration;

use crate::config::client_config::ClientConfig;
use crate::error_handler::{Result, env_opt, env_opt_bool, env_opt_parse};

impl ClientConfig {
    /// Builds a config from `ZOEKT_*` environment variables over the defaults.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidNumber`](crate::ConfigError::InvalidNumber) for unparsable numbers
    /// - [`ConfigError::InvalidFormat`](crate::ConfigError::InvalidFormat) for bad booleans
    /// - any error from [`ClientConfig::validate`]
    pub fn from_env() -> Result<Self> {
        let mut cfg = ClientConfig::default();

        if let Some(host) = env_opt("ZOEKT_HOST") {
            cfg.host = host;
        }
        if let Some(port) = env_opt_parse::<u16>("ZOEKT_PORT", "expected u16 (1..=65535)")? {
            cfg.port = port;
        }
        if let Some(secs) = env_opt_parse::<u64>("ZOEKT_TIMEOUT_SECS", "expected u64 seconds")? {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_opt_parse::<u32>("ZOEKT_MAX_ATTEMPTS", "expected u32")? {
            cfg.retry.max_attempts = attempts;
        }
        if let Some(ms) =
            env_opt_parse::<u64>("ZOEKT_RETRY_BASE_DELAY_MS", "expected u64 milliseconds")?
        {
            cfg.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) =
            env_opt_parse::<u64>("ZOEKT_RETRY_MAX_DELAY_MS", "expected u64 milliseconds")?
        {
            cfg.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(strict) = env_opt_bool("ZOEKT_STRICT_LINE_MATCHES")? {
            cfg.strict_line_matches = strict;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

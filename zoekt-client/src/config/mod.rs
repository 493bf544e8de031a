//! Client configuration: connection target, per-attempt timeout, retry policy.

pub mod client_config;
pub mod default_config;

pub use client_config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};

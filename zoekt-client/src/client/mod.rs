//! Client facades.
//!
//! [`ZoektClient`] (async) and [`BlockingZoektClient`] expose the same
//! operations and share every step except the actual send and sleep: request
//! building, status classification and decoding all live in this module.

pub mod async_client;
pub mod blocking;

pub use async_client::ZoektClient;
pub use blocking::BlockingZoektClient;

use crate::config::ClientConfig;
use crate::decode::{DecodeOptions, decode_repository_list, decode_search};
use crate::error_handler::Result;
use crate::model::{RepositoryListResult, SearchResult};
use crate::options::{ListField, ListRequest, SearchOptions, encode};
use crate::transport::{Endpoint, HttpRequest};

fn search_request(config: &ClientConfig, query: &str, options: &SearchOptions) -> Result<HttpRequest> {
    let payload = encode(query, options)?;
    Ok(HttpRequest::new(
        &config.base_url(),
        Endpoint::Search,
        payload.to_json()?,
    ))
}

fn list_request(
    config: &ClientConfig,
    filter: Option<&str>,
    field: ListField,
) -> Result<HttpRequest> {
    let payload = ListRequest::with_field(filter, field);
    Ok(HttpRequest::new(
        &config.base_url(),
        Endpoint::List,
        payload.to_json()?,
    ))
}

fn finish_search(body: &[u8], config: &ClientConfig, options: &SearchOptions) -> Result<SearchResult> {
    let mut result = decode_search(
        body,
        DecodeOptions {
            strict_line_matches: config.strict_line_matches,
        },
    )?;
    if let Some(kind) = options.symbol_kind.as_deref() {
        result.retain_symbol_kind(kind);
    }
    Ok(result)
}

fn finish_list(body: &[u8]) -> Result<RepositoryListResult> {
    decode_repository_list(body)
}

use tracing::{debug, debug_span};

use super::{finish_list, finish_search, list_request, search_request};
use crate::config::ClientConfig;
use crate::error_handler::Result;
use crate::model::{RepositoryListResult, SearchResult};
use crate::options::{ListField, SearchOptions};
use crate::session::Session;
use crate::transport::{BlockingHttpTransport, BlockingTransport};

/// Blocking Zoekt client.
///
/// A call occupies the calling thread for the whole round trip, backoff
/// sleeps included. Do not use it from inside an async runtime; use
/// [`crate::ZoektClient`] there.
#[derive(Debug)]
pub struct BlockingZoektClient<T: BlockingTransport = BlockingHttpTransport> {
    config: ClientConfig,
    session: Session<T>,
}

impl BlockingZoektClient<BlockingHttpTransport> {
    /// # Errors
    /// Returns [`crate::ZoektError::Config`] for invalid settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = BlockingHttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: BlockingTransport> BlockingZoektClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        debug!(base_url = %config.base_url(), "zoekt blocking client created");
        Ok(Self {
            config,
            session: Session::new(transport),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs one search; see [`crate::ZoektClient::search`] for the error cases.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResult> {
        let _span = debug_span!("search", query).entered();
        let transport = self.session.acquire()?;
        let request = search_request(&self.config, query, options)?;

        let body = self.config.retry.run_blocking("search", || {
            transport.send(&request)?.into_body(&request.url)
        })?;

        finish_search(&body, &self.config, options)
    }

    /// Lists indexed repositories, optionally restricted by a Zoekt query.
    pub fn list_repositories(&self, filter: Option<&str>) -> Result<RepositoryListResult> {
        self.list_repositories_with(filter, ListField::Repos)
    }

    /// Listing with an explicit form; see [`crate::ZoektClient::list_repositories_with`].
    pub fn list_repositories_with(
        &self,
        filter: Option<&str>,
        field: ListField,
    ) -> Result<RepositoryListResult> {
        let _span = debug_span!(
            "list_repositories",
            filter = filter.unwrap_or_default(),
            ?field
        )
        .entered();
        let transport = self.session.acquire()?;
        let request = list_request(&self.config, filter, field)?;

        let body = self.config.retry.run_blocking("list", || {
            transport.send(&request)?.into_body(&request.url)
        })?;

        finish_list(&body)
    }

    /// Runs `queries` one after another with the same options, stopping at the
    /// first failure.
    pub fn search_batch<I, S>(
        &self,
        queries: I,
        options: &SearchOptions,
    ) -> Result<Vec<(String, SearchResult)>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        queries
            .into_iter()
            .map(|q| {
                let q = q.into();
                let result = self.search(&q, options)?;
                Ok((q, result))
            })
            .collect()
    }

    /// Releases the transport. Idempotent.
    pub fn close(&self) {
        if self.session.close() {
            debug!("zoekt blocking client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

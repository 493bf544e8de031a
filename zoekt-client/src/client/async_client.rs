use futures::future::try_join_all;
use tracing::{debug, instrument};

use super::{finish_list, finish_search, list_request, search_request};
use crate::config::ClientConfig;
use crate::error_handler::Result;
use crate::model::{RepositoryListResult, SearchResult};
use crate::options::{ListField, SearchOptions};
use crate::session::Session;
use crate::transport::{AsyncTransport, HttpTransport};

/// Async Zoekt client.
///
/// Calls suspend only at I/O and backoff points; the client can be shared
/// (e.g. behind an `Arc`) and used from many tasks at once. Backoff uses
/// `tokio::time::sleep`, so a Tokio runtime with the time driver is required.
///
/// ```no_run
/// use zoekt_client::{ClientConfig, SearchOptions, ZoektClient};
///
/// # async fn run() -> zoekt_client::Result<()> {
/// let client = ZoektClient::new(ClientConfig::default())?;
/// let result = client
///     .search("def my_function", &SearchOptions::new().context_lines(2))
///     .await?;
/// for file in &result.files {
///     println!("{} ({} matches)", file.file_name, file.match_len());
/// }
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ZoektClient<T: AsyncTransport = HttpTransport> {
    config: ClientConfig,
    session: Session<T>,
}

impl ZoektClient<HttpTransport> {
    /// Validates `config` and builds a pooled HTTP transport for it.
    ///
    /// # Errors
    /// Returns [`crate::ZoektError::Config`] for invalid settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Same as [`ZoektClient::new`] with [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: AsyncTransport> ZoektClient<T> {
    /// Uses a caller-provided transport (e.g. a test double).
    ///
    /// # Errors
    /// Returns [`crate::ZoektError::Config`] for invalid settings.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        debug!(base_url = %config.base_url(), "zoekt client created");
        Ok(Self {
            config,
            session: Session::new(transport),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs one search.
    ///
    /// # Errors
    /// - [`crate::ZoektError::ClientClosed`] after [`ZoektClient::close`]
    /// - [`crate::ZoektError::InvalidOption`] for rejected options
    /// - [`crate::ZoektError::Transport`] / [`crate::ZoektError::Service`] once retries are exhausted
    /// - [`crate::ZoektError::Decode`] for an unreadable response
    #[instrument(skip_all, fields(query = %query))]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResult> {
        let transport = self.session.acquire()?;
        let request = search_request(&self.config, query, options)?;

        let (transport, request) = (&*transport, &request);
        let body = self
            .config
            .retry
            .run_async("search", move || async move {
                transport.send(request).await?.into_body(&request.url)
            })
            .await?;

        finish_search(&body, &self.config, options)
    }

    /// Lists indexed repositories, optionally restricted by a Zoekt query
    /// such as `repo:org/`.
    pub async fn list_repositories(&self, filter: Option<&str>) -> Result<RepositoryListResult> {
        self.list_repositories_with(filter, ListField::Repos).await
    }

    /// Same as [`ZoektClient::list_repositories`] with an explicit listing
    /// form; [`ListField::ReposMap`] returns the compact per-id entries.
    #[instrument(
        name = "list_repositories",
        skip_all,
        fields(filter = filter.unwrap_or_default(), field = ?field)
    )]
    pub async fn list_repositories_with(
        &self,
        filter: Option<&str>,
        field: ListField,
    ) -> Result<RepositoryListResult> {
        let transport = self.session.acquire()?;
        let request = list_request(&self.config, filter, field)?;

        let (transport, request) = (&*transport, &request);
        let body = self
            .config
            .retry
            .run_async("list", move || async move {
                transport.send(request).await?.into_body(&request.url)
            })
            .await?;

        finish_list(&body)
    }

    /// Runs `queries` concurrently with the same options.
    ///
    /// Results come back in input order. The first failure cancels the
    /// remaining searches and is returned.
    #[instrument(skip_all)]
    pub async fn search_batch<I, S>(
        &self,
        queries: I,
        options: &SearchOptions,
    ) -> Result<Vec<(String, SearchResult)>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries: Vec<String> = queries.into_iter().map(Into::into).collect();
        debug!(count = queries.len(), "running search batch");
        let results = try_join_all(queries.iter().map(|q| self.search(q, options))).await?;
        Ok(queries.into_iter().zip(results).collect())
    }

    /// Releases the transport. Idempotent; in-flight calls finish normally.
    pub fn close(&self) {
        if self.session.close() {
            debug!("zoekt client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

//! Client library for the [Zoekt](https://github.com/sourcegraph/zoekt) code
//! search JSON API.
//!
//! Two facades share one pipeline:
//!
//! - [`ZoektClient`]: async, built on `reqwest` and Tokio;
//! - [`BlockingZoektClient`]: blocking, for scripts and CLIs.
//!
//! Both encode [`SearchOptions`] into the `/api/search` payload, retry
//! transient failures per [`RetryPolicy`], classify failures into
//! [`ZoektError`] variants and decode responses into the typed [`model`].
//!
//! ```no_run
//! use zoekt_client::{BlockingZoektClient, ClientConfig, SearchOptions};
//!
//! let client = BlockingZoektClient::new(ClientConfig::new("localhost", 6070))?;
//! let result = client.search("def my_function", &SearchOptions::new().language("python"))?;
//! for file in &result.files {
//!     for line in &file.line_matches {
//!         println!("{}:{}: {}", file.file_name, line.line_number, line.decoded_line());
//!     }
//! }
//! # Ok::<(), zoekt_client::ZoektError>(())
//! ```

pub mod client;
pub mod config;
pub mod decode;
pub mod error_handler;
pub mod model;
pub mod options;
pub mod retry;
pub mod telemetry;
pub mod transport;

mod session;

pub use client::{BlockingZoektClient, ZoektClient};
pub use config::ClientConfig;
pub use error_handler::{ConfigError, InvalidOptionError, Result, TransportError, ZoektError};
pub use model::{
    ChunkMatch, FileMatch, LineFragment, LineMatch, RepositoryListResult, RepositoryStats,
    SearchResult, SearchStats,
};
pub use options::{ListField, SearchOptions};
pub use retry::RetryPolicy;
pub use transport::{
    AsyncTransport, BlockingHttpTransport, BlockingTransport, HttpRequest, HttpTransport,
    RawResponse,
};

//! Typed result model for Zoekt responses.
//!
//! Values are produced once by the decoder and are read-only afterwards. All
//! types serialize with `serde` so a renderer can emit them as JSON.

pub mod repository;
pub mod search;

pub use repository::{IndexStats, RepositoryBranch, RepositoryListResult, RepositoryStats};
pub use search::{
    ChunkMatch, FileMatch, LineFragment, LineMatch, Location, MatchRange, SearchResult,
    SearchStats, SymbolInfo,
};

//! Repository listing model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Root of a decoded repository listing, independent of [`SearchResult`](super::SearchResult).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryListResult {
    /// Listed repositories in service order.
    pub repositories: Vec<RepositoryStats>,
    /// Number of shards that crashed while listing.
    pub crashes: u64,
    /// Aggregate statistics over all listed repositories.
    pub stats: IndexStats,
}

impl RepositoryListResult {
    /// Looks up a listed repository by exact name.
    pub fn get(&self, name: &str) -> Option<&RepositoryStats> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Looks up a listed repository by numeric id. Works for both listing
    /// forms; compact `ReposMap` entries carry no name.
    pub fn by_id(&self, id: u32) -> Option<&RepositoryStats> {
        self.repositories.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

/// Summary of one indexed repository.
///
/// A compact listing only fills `id`, `branches`, `has_symbols` and
/// `last_indexed`; the remaining fields stay zero or empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryStats {
    /// Repository name (e.g. `github.com/org/repo`). Empty in a
    /// [`ListField::ReposMap`](crate::ListField::ReposMap) listing.
    pub name: String,
    /// Numeric repository id.
    pub id: u32,
    /// Browse URL, when configured.
    pub url: Option<String>,
    /// Indexed branches with their versions.
    pub branches: Vec<RepositoryBranch>,
    /// Number of indexed documents (files).
    pub file_count: u64,
    /// Time the index was built; `None` when the service reports none.
    pub last_indexed: Option<DateTime<Utc>>,
    /// Size of the indexed content in bytes.
    pub byte_size: u64,
    /// Size of the index itself in bytes.
    pub index_bytes: u64,
    /// Number of shards holding the repository.
    pub shards: u64,
    /// Whether symbol information was indexed.
    pub has_symbols: bool,
    /// Date of the newest indexed commit, if known.
    pub latest_commit_date: Option<DateTime<Utc>>,
    /// Language name → number of files.
    pub languages: BTreeMap<String, u64>,
}

/// A branch name with the indexed commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryBranch {
    pub name: String,
    pub version: String,
}

/// Aggregate repository statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub repos: u64,
    pub shards: u64,
    pub documents: u64,
    pub index_bytes: u64,
    pub content_bytes: u64,
    pub new_lines_count: u64,
    pub default_branch_new_lines_count: u64,
    pub other_branches_new_lines_count: u64,
}

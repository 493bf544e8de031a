//! Decoding of Zoekt JSON responses into the typed result model.
//!
//! Wire structs mirror the service's PascalCase JSON and are private; every
//! field is optional so that absent keys and JSON `null` decode as empty or
//! zero. Unknown keys are ignored at every level. Byte slices (`Line`,
//! `Content`, `Before`, `After`) arrive base64-encoded and are decoded here.
//!
//! Both client variants call these functions, so a given body always yields
//! the same typed tree regardless of how it was fetched.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error_handler::{Result, ZoektError};
use crate::model::{
    ChunkMatch, FileMatch, IndexStats, LineFragment, LineMatch, Location, MatchRange,
    RepositoryBranch, RepositoryListResult, RepositoryStats, SearchResult, SearchStats, SymbolInfo,
};

/// Knobs for search-response decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject a file whose `LineMatches` is present but empty while it carries
    /// no `ChunkMatches` either.
    pub strict_line_matches: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_line_matches: true,
        }
    }
}

/// Decodes the body of `POST /api/search`.
///
/// Accepts both `{"Result": {...}}` and a bare result object.
///
/// # Errors
/// Returns [`ZoektError::Decode`] for malformed JSON, invalid base64 or
/// timestamps, and (in strict mode) files with an empty `LineMatches` list.
pub fn decode_search(body: &[u8], opts: DecodeOptions) -> Result<SearchResult> {
    let envelope: SearchEnvelope = parse_json(body, "search response")?;
    let wire = match envelope.result {
        Some(result) => result,
        None => parse_json(body, "search response")?,
    };
    wire.into_model(opts)
}

/// Decodes the body of `POST /api/list`.
///
/// Accepts both `{"List": {...}}` and a bare list object.
///
/// # Errors
/// Returns [`ZoektError::Decode`] for malformed JSON or timestamps.
pub fn decode_repository_list(body: &[u8]) -> Result<RepositoryListResult> {
    let envelope: ListEnvelope = parse_json(body, "repository list response")?;
    let wire = match envelope.list {
        Some(list) => list,
        None => parse_json(body, "repository list response")?,
    };
    wire.into_model()
}

fn parse_json<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| ZoektError::decode(format!("invalid {what}: {e}")))
}

fn decode_b64(raw: Option<String>, field: &str) -> Result<Vec<u8>> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) => STANDARD
            .decode(s.as_bytes())
            .map_err(|e| ZoektError::decode(format!("{field} is not valid base64: {e}"))),
    }
}

/// Parses an RFC 3339 timestamp. A timestamp without offset is taken as UTC;
/// Go's zero time (year 1) and empty strings mean "absent".
fn parse_timestamp(raw: Option<String>, field: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(s) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .map_err(|e| ZoektError::decode(format!("{field} is not a valid timestamp ({s}): {e}")))?;
    if parsed.year() <= 1 {
        return Ok(None);
    }
    Ok(Some(parsed))
}

fn nanos(raw: Option<i64>) -> Duration {
    Duration::from_nanos(raw.unwrap_or(0).max(0) as u64)
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.is_empty())
}

/* ==========================
Wire payloads: search
========================== */

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "Result", default)]
    result: Option<WireSearchResult>,
}

/// Zoekt embeds its `Stats` struct, so counters sit next to `Files`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireSearchResult {
    files: Option<Vec<WireFileMatch>>,
    #[serde(rename = "RepoURLs")]
    repo_urls: Option<BTreeMap<String, String>>,
    line_fragments: Option<BTreeMap<String, String>>,

    content_bytes_loaded: Option<u64>,
    index_bytes_loaded: Option<u64>,
    crashes: Option<u64>,
    duration: Option<i64>,
    file_count: Option<u64>,
    shard_files_considered: Option<u64>,
    files_considered: Option<u64>,
    files_loaded: Option<u64>,
    files_skipped: Option<u64>,
    shards_scanned: Option<u64>,
    shards_skipped: Option<u64>,
    shards_skipped_filter: Option<u64>,
    match_count: Option<u64>,
    ngram_matches: Option<u64>,
    ngram_lookups: Option<u64>,
    wait: Option<i64>,
    match_tree_construction: Option<i64>,
    match_tree_search: Option<i64>,
    regexps_considered: Option<u64>,
    flush_reason: Option<u64>,
}

impl WireSearchResult {
    fn into_model(self, opts: DecodeOptions) -> Result<SearchResult> {
        let stats = SearchStats {
            content_bytes_loaded: self.content_bytes_loaded.unwrap_or(0),
            index_bytes_loaded: self.index_bytes_loaded.unwrap_or(0),
            crashes: self.crashes.unwrap_or(0),
            duration: nanos(self.duration),
            file_count: self.file_count.unwrap_or(0),
            shard_files_considered: self.shard_files_considered.unwrap_or(0),
            files_considered: self.files_considered.unwrap_or(0),
            files_loaded: self.files_loaded.unwrap_or(0),
            files_skipped: self.files_skipped.unwrap_or(0),
            shards_scanned: self.shards_scanned.unwrap_or(0),
            shards_skipped: self.shards_skipped.unwrap_or(0),
            shards_skipped_filter: self.shards_skipped_filter.unwrap_or(0),
            match_count: self.match_count.unwrap_or(0),
            ngram_matches: self.ngram_matches.unwrap_or(0),
            ngram_lookups: self.ngram_lookups.unwrap_or(0),
            wait: nanos(self.wait),
            match_tree_construction: nanos(self.match_tree_construction),
            match_tree_search: nanos(self.match_tree_search),
            regexps_considered: self.regexps_considered.unwrap_or(0),
            flush_reason: self.flush_reason.unwrap_or(0),
        };

        let files = self
            .files
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.into_model(i, opts))
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchResult {
            files,
            repo_urls: self.repo_urls.unwrap_or_default(),
            line_fragments: self.line_fragments.unwrap_or_default(),
            stats,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireFileMatch {
    file_name: Option<String>,
    repository: Option<String>,
    #[serde(rename = "RepositoryID")]
    repository_id: Option<u32>,
    version: Option<String>,
    language: Option<String>,
    branches: Option<Vec<String>>,
    line_matches: Option<Vec<WireLineMatch>>,
    chunk_matches: Option<Vec<WireChunkMatch>>,
    checksum: Option<String>,
    score: Option<f64>,
    debug: Option<String>,
}

impl WireFileMatch {
    fn into_model(self, index: usize, opts: DecodeOptions) -> Result<FileMatch> {
        let file_name = self.file_name.unwrap_or_default();
        let has_chunks = self.chunk_matches.as_ref().is_some_and(|c| !c.is_empty());

        if opts.strict_line_matches
            && !has_chunks
            && self.line_matches.as_ref().is_some_and(Vec::is_empty)
        {
            return Err(ZoektError::decode(format!(
                "Files[{index}] ({file_name}) has an empty LineMatches list"
            )));
        }

        let line_matches = self
            .line_matches
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(j, m)| m.into_model(&format!("Files[{index}].LineMatches[{j}]")))
            .collect::<Result<Vec<_>>>()?;

        let chunk_matches = self
            .chunk_matches
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(j, c)| c.into_model(&format!("Files[{index}].ChunkMatches[{j}]")))
            .collect::<Result<Vec<_>>>()?;

        Ok(FileMatch {
            file_name,
            repository: self.repository.unwrap_or_default(),
            repository_id: self.repository_id.unwrap_or(0),
            version: self.version.unwrap_or_default(),
            language: non_empty(self.language),
            branches: self.branches.unwrap_or_default(),
            line_matches,
            chunk_matches,
            checksum: self.checksum.unwrap_or_default(),
            score: self.score.unwrap_or(0.0),
            debug: non_empty(self.debug),
        })
    }
}

/// `Before`/`After` are one base64 block in Zoekt; some proxies send a list of
/// base64 lines instead.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireContext {
    Block(String),
    Lines(Vec<String>),
}

impl WireContext {
    fn decode(raw: Option<Self>, field: &str) -> Result<Vec<u8>> {
        match raw {
            None => Ok(Vec::new()),
            Some(Self::Block(s)) => decode_b64(Some(s), field),
            Some(Self::Lines(lines)) => {
                let mut out = Vec::new();
                for line in lines {
                    out.extend(decode_b64(Some(line), field)?);
                    if out.last() != Some(&b'\n') {
                        out.push(b'\n');
                    }
                }
                Ok(out)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireLineMatch {
    line: Option<String>,
    line_start: Option<u64>,
    line_end: Option<u64>,
    line_number: Option<u32>,
    before: Option<WireContext>,
    after: Option<WireContext>,
    file_name: Option<bool>,
    score: Option<f64>,
    line_fragments: Option<Vec<WireLineFragment>>,
}

impl WireLineMatch {
    fn into_model(self, path: &str) -> Result<LineMatch> {
        Ok(LineMatch {
            line: decode_b64(self.line, &format!("{path}.Line"))?,
            line_number: self.line_number.unwrap_or(0),
            line_start: self.line_start.unwrap_or(0),
            line_end: self.line_end.unwrap_or(0),
            before: WireContext::decode(self.before, &format!("{path}.Before"))?,
            after: WireContext::decode(self.after, &format!("{path}.After"))?,
            file_name: self.file_name.unwrap_or(false),
            score: self.score.unwrap_or(0.0),
            fragments: self
                .line_fragments
                .unwrap_or_default()
                .into_iter()
                .map(WireLineFragment::into_model)
                .collect(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireLineFragment {
    line_offset: Option<usize>,
    offset: Option<u64>,
    match_length: Option<usize>,
    symbol_info: Option<WireSymbol>,
}

impl WireLineFragment {
    fn into_model(self) -> LineFragment {
        LineFragment {
            line_offset: self.line_offset.unwrap_or(0),
            offset: self.offset.unwrap_or(0),
            match_length: self.match_length.unwrap_or(0),
            symbol: self.symbol_info.map(WireSymbol::into_model),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireSymbol {
    sym: Option<String>,
    kind: Option<String>,
    parent: Option<String>,
    parent_kind: Option<String>,
}

impl WireSymbol {
    fn into_model(self) -> SymbolInfo {
        SymbolInfo {
            sym: self.sym.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            parent: non_empty(self.parent),
            parent_kind: non_empty(self.parent_kind),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireChunkMatch {
    content: Option<String>,
    content_start: Option<WireLocation>,
    ranges: Option<Vec<WireRange>>,
    symbol_info: Option<Vec<Option<WireSymbol>>>,
    file_name: Option<bool>,
    score: Option<f64>,
    best_line_match: Option<u32>,
}

impl WireChunkMatch {
    fn into_model(self, path: &str) -> Result<ChunkMatch> {
        Ok(ChunkMatch {
            content: decode_b64(self.content, &format!("{path}.Content"))?,
            content_start: self
                .content_start
                .map(WireLocation::into_model)
                .unwrap_or_default(),
            ranges: self
                .ranges
                .unwrap_or_default()
                .into_iter()
                .map(|r| MatchRange {
                    start: r.start.map(WireLocation::into_model).unwrap_or_default(),
                    end: r.end.map(WireLocation::into_model).unwrap_or_default(),
                })
                .collect(),
            symbol_info: self
                .symbol_info
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.map(WireSymbol::into_model))
                .collect(),
            file_name: self.file_name.unwrap_or(false),
            score: self.score.unwrap_or(0.0),
            best_line_match: self.best_line_match,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireLocation {
    byte_offset: Option<u64>,
    line_number: Option<u32>,
    column: Option<u32>,
}

impl WireLocation {
    fn into_model(self) -> Location {
        Location {
            byte_offset: self.byte_offset.unwrap_or(0),
            line_number: self.line_number.unwrap_or(0),
            column: self.column.unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireRange {
    start: Option<WireLocation>,
    end: Option<WireLocation>,
}

/* ==========================
Wire payloads: list
========================== */

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(rename = "List", default)]
    list: Option<WireRepoList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireRepoList {
    repos: Option<Vec<WireRepoListEntry>>,
    repos_map: Option<BTreeMap<String, WireMinimalRepo>>,
    crashes: Option<u64>,
    stats: Option<WireRepoStats>,
}

impl WireRepoList {
    fn into_model(self) -> Result<RepositoryListResult> {
        let mut repositories = self
            .repos
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, entry)| entry.into_model(i))
            .collect::<Result<Vec<_>>>()?;

        // Map keys are decimal ids; string order would put "10" before "9".
        let mut minimal = self
            .repos_map
            .unwrap_or_default()
            .into_iter()
            .map(|(key, entry)| entry.into_model(&key))
            .collect::<Result<Vec<_>>>()?;
        minimal.sort_by_key(|repo| repo.id);
        repositories.extend(minimal);

        Ok(RepositoryListResult {
            repositories,
            crashes: self.crashes.unwrap_or(0),
            stats: self.stats.unwrap_or_default().into_model(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireRepoListEntry {
    repository: Option<WireRepository>,
    index_metadata: Option<WireIndexMetadata>,
    stats: Option<WireRepoStats>,
}

impl WireRepoListEntry {
    fn into_model(self, index: usize) -> Result<RepositoryStats> {
        let repo = self.repository.unwrap_or_default();
        let meta = self.index_metadata.unwrap_or_default();
        let stats = self.stats.unwrap_or_default();

        Ok(RepositoryStats {
            name: repo.name.unwrap_or_default(),
            id: repo.id.unwrap_or(0),
            url: non_empty(repo.url),
            branches: repo
                .branches
                .unwrap_or_default()
                .into_iter()
                .map(WireBranch::into_model)
                .collect(),
            file_count: stats.documents.unwrap_or(0),
            last_indexed: parse_timestamp(
                meta.index_time,
                &format!("Repos[{index}].IndexMetadata.IndexTime"),
            )?,
            byte_size: stats.content_bytes.unwrap_or(0),
            index_bytes: stats.index_bytes.unwrap_or(0),
            shards: stats.shards.unwrap_or(0),
            has_symbols: repo.has_symbols.unwrap_or(false),
            latest_commit_date: parse_timestamp(
                repo.latest_commit_date,
                &format!("Repos[{index}].Repository.LatestCommitDate"),
            )?,
            languages: meta.language_map.unwrap_or_default(),
        })
    }
}

/// `ReposMap` value: the compact listing Zoekt returns for `Field: 2`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireMinimalRepo {
    has_symbols: Option<bool>,
    branches: Option<Vec<WireBranch>>,
    index_time_unix: Option<i64>,
}

impl WireMinimalRepo {
    fn into_model(self, key: &str) -> Result<RepositoryStats> {
        let id = key.parse::<u32>().map_err(|_| {
            ZoektError::decode(format!("ReposMap[{key:?}]: repository id is not a number"))
        })?;
        let last_indexed = match self.index_time_unix {
            None | Some(0) => None,
            Some(secs) => Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                ZoektError::decode(format!(
                    "ReposMap[{key:?}].IndexTimeUnix: {secs} is out of range"
                ))
            })?),
        };

        Ok(RepositoryStats {
            name: String::new(),
            id,
            url: None,
            branches: self
                .branches
                .unwrap_or_default()
                .into_iter()
                .map(WireBranch::into_model)
                .collect(),
            file_count: 0,
            last_indexed,
            byte_size: 0,
            index_bytes: 0,
            shards: 0,
            has_symbols: self.has_symbols.unwrap_or(false),
            latest_commit_date: None,
            languages: BTreeMap::new(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireRepository {
    #[serde(rename = "ID")]
    id: Option<u32>,
    name: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    branches: Option<Vec<WireBranch>>,
    has_symbols: Option<bool>,
    latest_commit_date: Option<String>,
}

/// Zoekt sends `{"Name", "Version"}` objects; older tooling sends bare names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireBranch {
    Full {
        #[serde(rename = "Name", default)]
        name: Option<String>,
        #[serde(rename = "Version", default)]
        version: Option<String>,
    },
    Name(String),
}

impl WireBranch {
    fn into_model(self) -> RepositoryBranch {
        match self {
            Self::Full { name, version } => RepositoryBranch {
                name: name.unwrap_or_default(),
                version: version.unwrap_or_default(),
            },
            Self::Name(name) => RepositoryBranch {
                name,
                version: String::new(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireIndexMetadata {
    index_time: Option<String>,
    language_map: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct WireRepoStats {
    repos: Option<u64>,
    shards: Option<u64>,
    documents: Option<u64>,
    index_bytes: Option<u64>,
    content_bytes: Option<u64>,
    new_lines_count: Option<u64>,
    default_branch_new_lines_count: Option<u64>,
    other_branches_new_lines_count: Option<u64>,
}

impl WireRepoStats {
    fn into_model(self) -> IndexStats {
        IndexStats {
            repos: self.repos.unwrap_or(0),
            shards: self.shards.unwrap_or(0),
            documents: self.documents.unwrap_or(0),
            index_bytes: self.index_bytes.unwrap_or(0),
            content_bytes: self.content_bytes.unwrap_or(0),
            new_lines_count: self.new_lines_count.unwrap_or(0),
            default_branch_new_lines_count: self.default_branch_new_lines_count.unwrap_or(0),
            other_branches_new_lines_count: self.other_branches_new_lines_count.unwrap_or(0),
        }
    }
}

//! Search response model: files, line matches, chunk matches, statistics.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Duration;

use serde::Serialize;

/// Root of a decoded search response.
///
/// `files` keeps the order returned by the service; it is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Matching files in service order.
    pub files: Vec<FileMatch>,
    /// Repository name → URL template for files in that repository.
    pub repo_urls: BTreeMap<String, String>,
    /// Repository name → line fragment template (e.g. `#L{{.LineNumber}}`).
    pub line_fragments: BTreeMap<String, String>,
    /// Summary counters reported by the service.
    pub stats: SearchStats,
}

impl SearchResult {
    /// Total number of matches reported by the service.
    pub fn match_count(&self) -> u64 {
        self.stats.match_count
    }

    /// Total number of matching files reported by the service.
    pub fn file_count(&self) -> u64 {
        self.stats.file_count
    }

    /// `true` when the service returned no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Keeps only matches on symbols of `kind` (ASCII case-insensitive) and
    /// drops files left without matches. `stats` keep the service's counts.
    pub fn retain_symbol_kind(&mut self, kind: &str) {
        let is_kind = |s: &Option<SymbolInfo>| {
            s.as_ref()
                .is_some_and(|s| s.kind.eq_ignore_ascii_case(kind))
        };
        for file in &mut self.files {
            file.line_matches
                .retain(|m| m.fragments.iter().any(|f| is_kind(&f.symbol)));
            file.chunk_matches
                .retain(|c| c.symbol_info.iter().any(is_kind));
        }
        self.files.retain(|f| f.match_len() > 0);
    }
}

/// Search statistics.
///
/// Absent counters decode as zero; durations are reported by Zoekt in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub content_bytes_loaded: u64,
    pub index_bytes_loaded: u64,
    pub crashes: u64,
    /// Wall time spent by the service on the search.
    pub duration: Duration,
    pub file_count: u64,
    pub shard_files_considered: u64,
    pub files_considered: u64,
    pub files_loaded: u64,
    pub files_skipped: u64,
    pub shards_scanned: u64,
    pub shards_skipped: u64,
    pub shards_skipped_filter: u64,
    pub match_count: u64,
    pub ngram_matches: u64,
    pub ngram_lookups: u64,
    /// Time spent waiting for a search slot.
    pub wait: Duration,
    pub match_tree_construction: Duration,
    pub match_tree_search: Duration,
    pub regexps_considered: u64,
    pub flush_reason: u64,
}

/// One source file with its matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMatch {
    /// Path of the file inside the repository.
    pub file_name: String,
    /// Name of the repository the file belongs to.
    pub repository: String,
    /// Numeric repository id, `0` when the service does not report it.
    pub repository_id: u32,
    /// Commit or version the file was indexed at.
    pub version: String,
    /// Detected language, if any.
    pub language: Option<String>,
    /// Branches containing this version of the file.
    pub branches: Vec<String>,
    /// Matching lines, in service order. Empty in chunk mode.
    pub line_matches: Vec<LineMatch>,
    /// Matching chunks, in service order. Empty in line mode.
    pub chunk_matches: Vec<ChunkMatch>,
    /// Content checksum as sent by the service.
    pub checksum: String,
    /// Ranking score.
    pub score: f64,
    /// Debug scoring details, when requested.
    pub debug: Option<String>,
}

impl FileMatch {
    /// Number of line or chunk matches in this file.
    pub fn match_len(&self) -> usize {
        self.line_matches.len() + self.chunk_matches.len()
    }
}

/// One matching line within a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineMatch {
    /// Raw bytes of the line, without the trailing newline.
    pub line: Vec<u8>,
    /// 1-based line number.
    pub line_number: u32,
    /// Byte offset of the line start within the file.
    pub line_start: u64,
    /// Byte offset of the line end within the file.
    pub line_end: u64,
    /// Raw context lines before the match (as one block, newline separated).
    pub before: Vec<u8>,
    /// Raw context lines after the match.
    pub after: Vec<u8>,
    /// The match is on the file name rather than the content.
    pub file_name: bool,
    /// Ranking score.
    pub score: f64,
    /// Matched substrings of this line.
    pub fragments: Vec<LineFragment>,
}

impl LineMatch {
    /// Human-readable line text. Invalid UTF-8 is replaced, the stored bytes
    /// are untouched, so repeated calls return identical output.
    pub fn decoded_line(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.line)
    }

    /// Context lines before the match, split on newlines.
    pub fn decoded_before(&self) -> Vec<String> {
        split_context(&self.before)
    }

    /// Context lines after the match, split on newlines.
    pub fn decoded_after(&self) -> Vec<String> {
        split_context(&self.after)
    }

    /// Byte ranges of matched substrings relative to the start of the line.
    pub fn matched_ranges(&self) -> Vec<Range<usize>> {
        self.fragments.iter().map(LineFragment::line_range).collect()
    }

    /// Matched substrings decoded as text, in fragment order.
    ///
    /// Ranges that fall outside the line are skipped.
    pub fn matched_texts(&self) -> Vec<Cow<'_, str>> {
        self.fragments
            .iter()
            .filter_map(|f| self.line.get(f.line_range()))
            .map(String::from_utf8_lossy)
            .collect()
    }
}

fn split_context(raw: &[u8]) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(raw);
    text.strip_suffix('\n')
        .unwrap_or(&text)
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// A matched substring within a [`LineMatch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineFragment {
    /// Offset of the match relative to the line start.
    pub line_offset: usize,
    /// Absolute byte offset of the match within the file.
    pub offset: u64,
    /// Length of the match in bytes.
    pub match_length: usize,
    /// Symbol information when the match is on a symbol definition.
    pub symbol: Option<SymbolInfo>,
}

impl LineFragment {
    /// Byte range of the match relative to the line start.
    ///
    /// Offsets come from the service unchecked; the end saturates instead of
    /// overflowing, so a corrupt fragment yields a range outside the line.
    pub fn line_range(&self) -> Range<usize> {
        self.line_offset..self.line_offset.saturating_add(self.match_length)
    }
}

/// Symbol metadata attached to a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    pub sym: String,
    pub kind: String,
    pub parent: Option<String>,
    pub parent_kind: Option<String>,
}

/// A multi-line chunk of matching content (Zoekt chunk mode).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMatch {
    /// Raw bytes of the chunk.
    pub content: Vec<u8>,
    /// Where the chunk starts in the file.
    pub content_start: Location,
    /// Matched ranges inside the chunk.
    pub ranges: Vec<MatchRange>,
    /// Per-range symbol information; `None` entries for non-symbol ranges.
    pub symbol_info: Vec<Option<SymbolInfo>>,
    /// The match is on the file name rather than the content.
    pub file_name: bool,
    /// Ranking score.
    pub score: f64,
    /// Line number of the best-scoring line in the chunk, if reported.
    pub best_line_match: Option<u32>,
}

impl ChunkMatch {
    /// Human-readable chunk text; see [`LineMatch::decoded_line`].
    pub fn decoded_content(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// A position in a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub byte_offset: u64,
    pub line_number: u32,
    pub column: u32,
}

/// A `[start, end)` span between two [`Location`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchRange {
    pub start: Location,
    pub end: Location,
}

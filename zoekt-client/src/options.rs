//! Search options and request payload encoding.
//!
//! [`SearchOptions`] is the caller-facing set of modifiers. [`encode`] turns a
//! query plus options into the `POST /api/search` payload: filters become query
//! atoms (`lang:`, `file:`, ...), the rest lands in the `Opts` object. Raw
//! overrides win over named fields for the same `Opts` key. `Opts` is a
//! `BTreeMap`, so identical inputs serialize to identical bytes.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error_handler::{InvalidOptionError, Result, ZoektError};

const NUM_CONTEXT_LINES: &str = "NumContextLines";
const MAX_DOC_DISPLAY_COUNT: &str = "MaxDocDisplayCount";
const MAX_WALL_TIME: &str = "MaxWallTime";
const FLUSH_WALL_TIME: &str = "FlushWallTime";
const CHUNK_MATCHES: &str = "ChunkMatches";
const WHOLE: &str = "Whole";
const TOTAL_MAX_MATCH_COUNT: &str = "TotalMaxMatchCount";
const SHARD_MAX_MATCH_COUNT: &str = "ShardMaxMatchCount";

/// Modifiers for a single search call.
///
/// Every field is optional; unset fields are not sent and the service default
/// applies. The one exception is `ChunkMatches`, which is sent as `true` unless
/// set either here or through [`SearchOptions::raw`].
///
/// ```
/// use zoekt_client::SearchOptions;
///
/// let opts = SearchOptions::new()
///     .language("python")
///     .context_lines(2)
///     .max_matches(50);
/// assert_eq!(opts.context_lines, Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Context lines around each match (`Opts.NumContextLines`).
    pub context_lines: Option<u32>,
    /// Maximum number of files to return (`Opts.MaxDocDisplayCount`).
    pub max_matches: Option<u32>,
    /// Adds `case:yes` / `case:no` to the query.
    pub case_sensitive: Option<bool>,
    /// Adds `lang:<value>` to the query.
    pub language: Option<String>,
    /// Adds `file:<value>` to the query.
    pub file_pattern: Option<String>,
    /// Adds `repo:<value>` to the query.
    pub repository: Option<String>,
    /// Wraps the query's free text as `sym:<text>`; modifiers already in the
    /// query (`lang:go`, `-file:test`, ...) stay outside the pattern.
    pub symbol: bool,
    /// Keeps only matches on symbols of this kind (e.g. `function`).
    pub symbol_kind: Option<String>,
    /// Server-side search deadline (`Opts.MaxWallTime`, in nanoseconds).
    pub max_wall_time: Option<Duration>,
    /// Request chunk matches instead of line matches (`Opts.ChunkMatches`).
    pub chunk_matches: Option<bool>,
    /// Return whole file contents (`Opts.Whole`).
    pub whole: Option<bool>,
    /// `Opts.TotalMaxMatchCount`.
    pub total_max_match_count: Option<u32>,
    /// `Opts.ShardMaxMatchCount`.
    pub shard_max_match_count: Option<u32>,
    /// Restrict the search to these repository ids (payload `RepoIDs`).
    pub repo_ids: Option<Vec<u32>>,
    /// Raw `Opts` entries; they override named fields. Sent as-is except
    /// `MaxWallTime` / `FlushWallTime`, which are given in seconds (integer
    /// or fractional) and sent as nanoseconds.
    pub raw: BTreeMap<String, Value>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    #[must_use]
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = Some(yes);
        self
    }

    /// Turns the call into a symbol search, optionally limited to one kind.
    #[must_use]
    pub fn symbols(mut self, kind: Option<&str>) -> Self {
        self.symbol = true;
        self.symbol_kind = kind.map(str::to_string);
        self
    }

    #[must_use]
    pub fn context_lines(mut self, lines: u32) -> Self {
        self.context_lines = Some(lines);
        self
    }

    #[must_use]
    pub fn max_matches(mut self, max: u32) -> Self {
        self.max_matches = Some(max);
        self
    }

    #[must_use]
    pub fn max_wall_time(mut self, limit: Duration) -> Self {
        self.max_wall_time = Some(limit);
        self
    }

    #[must_use]
    pub fn chunk_matches(mut self, enabled: bool) -> Self {
        self.chunk_matches = Some(enabled);
        self
    }

    #[must_use]
    pub fn whole(mut self, enabled: bool) -> Self {
        self.whole = Some(enabled);
        self
    }

    #[must_use]
    pub fn total_max_match_count(mut self, max: u32) -> Self {
        self.total_max_match_count = Some(max);
        self
    }

    #[must_use]
    pub fn shard_max_match_count(mut self, max: u32) -> Self {
        self.shard_max_match_count = Some(max);
        self
    }

    #[must_use]
    pub fn repo_ids(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.repo_ids = Some(ids.into_iter().collect());
        self
    }

    /// Sets a raw `Opts` entry, replacing any named field mapped to the same key.
    ///
    /// Durations (`MaxWallTime`, `FlushWallTime`) are in seconds here:
    /// `raw("MaxWallTime", 2.5)` sends `2500000000`.
    #[must_use]
    pub fn raw(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw.insert(key.into(), value.into());
        self
    }
}

/// JSON payload of `POST /api/search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "Q")]
    pub query: String,
    #[serde(rename = "RepoIDs", skip_serializing_if = "Option::is_none")]
    pub repo_ids: Option<Vec<u32>>,
    #[serde(rename = "Opts")]
    pub opts: BTreeMap<String, Value>,
}

impl SearchRequest {
    pub(crate) fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| ZoektError::decode(format!("failed to encode search request: {e}")))
    }
}

/// Which listing Zoekt should return from `/api/list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListField {
    /// Full `Repos` entries with metadata and stats.
    #[default]
    Repos,
    /// Compact `ReposMap` keyed by repository id.
    ReposMap,
}

impl ListField {
    fn wire(self) -> u8 {
        match self {
            Self::Repos => 0,
            Self::ReposMap => 2,
        }
    }
}

/// JSON payload of `POST /api/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRequest {
    #[serde(rename = "Q")]
    pub query: String,
    #[serde(rename = "Opts")]
    pub opts: ListOpts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListOpts {
    #[serde(rename = "Field")]
    pub field: u8,
}

impl ListRequest {
    /// Listing of repositories matching `filter` (all repositories when `None`).
    pub fn new(filter: Option<&str>) -> Self {
        Self::with_field(filter, ListField::Repos)
    }

    pub fn with_field(filter: Option<&str>, field: ListField) -> Self {
        Self {
            query: filter.map(str::trim).unwrap_or_default().to_string(),
            opts: ListOpts {
                field: field.wire(),
            },
        }
    }

    pub(crate) fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| ZoektError::decode(format!("failed to encode list request: {e}")))
    }
}

/// Builds the search payload for `query` with `opts`.
///
/// Query atoms are appended in a fixed order (symbol wrapping, then `case`,
/// `lang`, `file`, `repo`); an atom already present in the query is not added
/// twice. Values containing whitespace are quoted.
///
/// # Errors
/// Returns [`ZoektError::InvalidOption`] for an empty query, empty filter
/// values, and `Opts` entries with the wrong type or range.
pub fn encode(query: &str, opts: &SearchOptions) -> Result<SearchRequest> {
    let query = query.trim();
    if query.is_empty() {
        return Err(InvalidOptionError::EmptyQuery.into());
    }

    let mut parts: Vec<String> = Vec::with_capacity(5);
    if opts.symbol {
        parts.extend(symbol_query(query));
    } else {
        parts.push(query.to_string());
    }

    if let Some(case) = opts.case_sensitive {
        push_atom(&mut parts, query, "case", if case { "yes" } else { "no" });
    }
    if let Some(lang) = &opts.language {
        push_atom(&mut parts, query, "lang", filter_value(lang, "language")?);
    }
    if let Some(file) = &opts.file_pattern {
        push_atom(&mut parts, query, "file", filter_value(file, "file")?);
    }
    if let Some(repo) = &opts.repository {
        push_atom(&mut parts, query, "repo", filter_value(repo, "repository")?);
    }
    if let Some(kind) = &opts.symbol_kind {
        filter_value(kind, "symbol kind")?;
    }

    let mut wire: BTreeMap<String, Value> = BTreeMap::new();
    if let Some(n) = opts.context_lines {
        wire.insert(NUM_CONTEXT_LINES.into(), n.into());
    }
    if let Some(n) = opts.max_matches {
        wire.insert(MAX_DOC_DISPLAY_COUNT.into(), n.into());
    }
    if let Some(limit) = opts.max_wall_time {
        let ns = u64::try_from(limit.as_nanos()).unwrap_or(u64::MAX);
        wire.insert(MAX_WALL_TIME.into(), ns.into());
    }
    if let Some(b) = opts.chunk_matches {
        wire.insert(CHUNK_MATCHES.into(), b.into());
    }
    if let Some(b) = opts.whole {
        wire.insert(WHOLE.into(), b.into());
    }
    if let Some(n) = opts.total_max_match_count {
        wire.insert(TOTAL_MAX_MATCH_COUNT.into(), n.into());
    }
    if let Some(n) = opts.shard_max_match_count {
        wire.insert(SHARD_MAX_MATCH_COUNT.into(), n.into());
    }
    for (key, value) in &opts.raw {
        wire.insert(key.clone(), raw_value(key, value)?);
    }
    wire.entry(CHUNK_MATCHES.into()).or_insert(Value::Bool(true));

    validate_opts(&wire)?;

    Ok(SearchRequest {
        query: parts.join(" "),
        repo_ids: opts.repo_ids.clone().filter(|ids| !ids.is_empty()),
        opts: wire,
    })
}

/// Zoekt query modifiers; a token starting with one of these (optionally
/// negated) is left outside the `sym:` pattern.
const ATOM_PREFIXES: &[&str] = &[
    "archived:", "b:", "branch:", "c:", "case:", "content:", "f:", "file:", "fork:", "lang:",
    "public:", "r:", "regex:", "repo:", "sym:", "t:", "type:",
];

fn is_atom(token: &str) -> bool {
    let token = token.strip_prefix('-').unwrap_or(token);
    ATOM_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
}

/// `sym:<text>` over the free text of `query`, followed by the query's own
/// atoms. A query made of atoms only is kept as it is.
fn symbol_query(query: &str) -> Vec<String> {
    let (atoms, text): (Vec<&str>, Vec<&str>) = query.split_whitespace().partition(|t| is_atom(t));
    if text.is_empty() {
        return vec![query.to_string()];
    }
    let mut parts = Vec::with_capacity(atoms.len() + 1);
    parts.push(format!("sym:{}", quote(&text.join(" "))));
    parts.extend(atoms.into_iter().map(str::to_string));
    parts
}

fn filter_value<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InvalidOptionError::EmptyFilter(name).into());
    }
    Ok(value)
}

fn quote(value: &str) -> String {
    if value.contains(char::is_whitespace) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn push_atom(parts: &mut Vec<String>, query: &str, prefix: &str, value: &str) {
    let atom = format!("{prefix}:{}", quote(value));
    if !query.split_whitespace().any(|token| token == atom) {
        parts.push(atom);
    }
}

/// Raw duration entries are seconds; Zoekt expects integer nanoseconds.
fn raw_value(key: &str, value: &Value) -> Result<Value> {
    if !matches!(key, MAX_WALL_TIME | FLUSH_WALL_TIME) {
        return Ok(value.clone());
    }
    let Some(secs) = value.as_f64() else {
        return Ok(value.clone());
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(InvalidOptionError::OutOfRange {
            key: key.to_string(),
            detail: "expected a non-negative number of seconds",
        }
        .into());
    }
    // Truncates toward zero; saturates at u64::MAX.
    Ok(Value::from((secs * 1e9) as u64))
}

fn validate_opts(opts: &BTreeMap<String, Value>) -> Result<()> {
    for (key, value) in opts {
        match key.as_str() {
            NUM_CONTEXT_LINES | MAX_WALL_TIME | FLUSH_WALL_TIME => non_negative_int(key, value)?,
            MAX_DOC_DISPLAY_COUNT | TOTAL_MAX_MATCH_COUNT | SHARD_MAX_MATCH_COUNT => {
                positive_int(key, value)?
            }
            CHUNK_MATCHES | WHOLE => {
                if !value.is_boolean() {
                    return Err(InvalidOptionError::WrongType {
                        key: key.clone(),
                        expected: "a boolean",
                    }
                    .into());
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn non_negative_int(key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Number(n) if n.is_u64() => Ok(()),
        Value::Number(_) => Err(InvalidOptionError::OutOfRange {
            key: key.to_string(),
            detail: "expected a non-negative integer",
        }
        .into()),
        _ => Err(InvalidOptionError::WrongType {
            key: key.to_string(),
            expected: "an integer",
        }
        .into()),
    }
}

fn positive_int(key: &str, value: &Value) -> Result<()> {
    match value.as_u64() {
        Some(n) if n > 0 => Ok(()),
        _ if value.is_number() => Err(InvalidOptionError::OutOfRange {
            key: key.to_string(),
            detail: "expected an integer greater than zero",
        }
        .into()),
        _ => Err(InvalidOptionError::WrongType {
            key: key.to_string(),
            expected: "an integer",
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invalid(res: Result<SearchRequest>) -> InvalidOptionError {
        match res {
            Err(ZoektError::InvalidOption(e)) => e,
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn plain_query_gets_default_chunk_matches() {
        let req = encode("def my_function", &SearchOptions::new()).unwrap();
        assert_eq!(req.query, "def my_function");
        assert_eq!(req.opts.get("ChunkMatches"), Some(&json!(true)));
        assert_eq!(req.repo_ids, None);
    }

    #[test]
    fn named_fields_map_to_opts() {
        let opts = SearchOptions::new()
            .context_lines(2)
            .max_matches(50)
            .max_wall_time(Duration::from_millis(1500))
            .chunk_matches(false)
            .whole(true)
            .total_max_match_count(1000)
            .shard_max_match_count(100)
            .repo_ids([3, 7]);
        let req = encode("foo", &opts).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "Q": "foo",
                "RepoIDs": [3, 7],
                "Opts": {
                    "ChunkMatches": false,
                    "MaxDocDisplayCount": 50,
                    "MaxWallTime": 1_500_000_000u64,
                    "NumContextLines": 2,
                    "ShardMaxMatchCount": 100,
                    "TotalMaxMatchCount": 1000,
                    "Whole": true
                }
            })
        );
    }

    #[test]
    fn atoms_follow_fixed_order_and_quote_whitespace() {
        let opts = SearchOptions::new()
            .repository("org/app")
            .file_pattern("my dir/.*\\.py")
            .language("python")
            .case_sensitive(true)
            .symbols(None);
        let req = encode("parse", &opts).unwrap();
        assert_eq!(
            req.query,
            "sym:parse case:yes lang:python file:\"my dir/.*\\.py\" repo:org/app"
        );
    }

    #[test]
    fn symbol_search_keeps_query_atoms_outside_pattern() {
        let opts = SearchOptions::new().symbols(None);
        let req = encode("lang:go parse args -file:_test", &opts).unwrap();
        assert_eq!(req.query, "sym:\"parse args\" lang:go -file:_test");

        let only_atoms = encode("repo:org/app", &opts).unwrap();
        assert_eq!(only_atoms.query, "repo:org/app");

        let with_filter = encode("lang:go Handler", &opts.clone().language("go")).unwrap();
        assert_eq!(with_filter.query, "sym:Handler lang:go");
    }

    #[test]
    fn atom_already_in_query_is_not_repeated() {
        let opts = SearchOptions::new().language("go").case_sensitive(false);
        let req = encode("lang:go handler", &opts).unwrap();
        assert_eq!(req.query, "lang:go handler case:no");
    }

    #[test]
    fn raw_override_wins_over_named_field() {
        let opts = SearchOptions::new()
            .context_lines(2)
            .raw("NumContextLines", 5)
            .raw("UseDocumentRanks", true);
        let req = encode("x", &opts).unwrap();
        assert_eq!(req.opts["NumContextLines"], json!(5));
        assert_eq!(req.opts["UseDocumentRanks"], json!(true));

        let chunk = encode("x", &SearchOptions::new().raw("ChunkMatches", false)).unwrap();
        assert_eq!(chunk.opts["ChunkMatches"], json!(false));
    }

    #[test]
    fn raw_wall_times_are_seconds() {
        let req = encode(
            "x",
            &SearchOptions::new()
                .raw("MaxWallTime", 5.0)
                .raw("FlushWallTime", 0.25),
        )
        .unwrap();
        assert_eq!(req.opts["MaxWallTime"], json!(5_000_000_000u64));
        assert_eq!(req.opts["FlushWallTime"], json!(250_000_000u64));

        let whole = encode("x", &SearchOptions::new().raw("MaxWallTime", 5)).unwrap();
        assert_eq!(whole.opts["MaxWallTime"], json!(5_000_000_000u64));

        let flush = encode("x", &SearchOptions::new().raw("FlushWallTime", 0.5)).unwrap();
        assert_eq!(flush.opts["FlushWallTime"], json!(500_000_000u64));
    }

    #[test]
    fn raw_wall_time_overrides_named_duration() {
        let opts = SearchOptions::new()
            .max_wall_time(Duration::from_millis(100))
            .raw("MaxWallTime", 2.5);
        let req = encode("x", &opts).unwrap();
        assert_eq!(req.opts["MaxWallTime"], json!(2_500_000_000u64));
        assert_eq!(opts.raw["MaxWallTime"], json!(2.5));
    }

    #[test]
    fn raw_wall_time_rejects_negative_and_non_numbers() {
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("MaxWallTime", -1.0))),
            InvalidOptionError::OutOfRange { ref key, .. } if key == "MaxWallTime"
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("FlushWallTime", "soon"))),
            InvalidOptionError::WrongType { ref key, .. } if key == "FlushWallTime"
        ));
    }

    #[test]
    fn encoding_does_not_mutate_options_and_is_deterministic() {
        let opts = SearchOptions::new()
            .language("rust")
            .raw("Zeta", 1)
            .raw("Alpha", 2);
        let snapshot = opts.clone();
        let a = encode("q", &opts).unwrap().to_json().unwrap();
        let b = encode("q", &opts).unwrap().to_json().unwrap();
        assert_eq!(a, b);
        assert_eq!(opts, snapshot);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(invalid(encode("   ", &SearchOptions::new())), InvalidOptionError::EmptyQuery);
        assert_eq!(
            invalid(encode("x", &SearchOptions::new().language(" "))),
            InvalidOptionError::EmptyFilter("language")
        );
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().max_matches(0))),
            InvalidOptionError::OutOfRange { ref key, .. } if key == "MaxDocDisplayCount"
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("MaxDocDisplayCount", -3))),
            InvalidOptionError::OutOfRange { .. }
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("NumContextLines", -1))),
            InvalidOptionError::OutOfRange { .. }
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("NumContextLines", 2.5))),
            InvalidOptionError::OutOfRange { .. }
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("NumContextLines", "two"))),
            InvalidOptionError::WrongType { .. }
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().raw("Whole", "yes"))),
            InvalidOptionError::WrongType { .. }
        ));
        assert!(matches!(
            invalid(encode("x", &SearchOptions::new().shard_max_match_count(0))),
            InvalidOptionError::OutOfRange { .. }
        ));
    }

    #[test]
    fn list_request_shapes() {
        let all = serde_json::to_value(ListRequest::new(None)).unwrap();
        assert_eq!(all, json!({"Q": "", "Opts": {"Field": 0}}));

        let map = ListRequest::with_field(Some(" org/ "), ListField::ReposMap);
        assert_eq!(
            serde_json::to_value(map).unwrap(),
            json!({"Q": "org/", "Opts": {"Field": 2}})
        );
    }
}

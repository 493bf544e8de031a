//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use zoekt_client::{ClientConfig, RetryPolicy};

pub const FIRST_LINE: &str = "def my_function(arg):";
pub const SECOND_LINE: &str = "def my_function_with_defaults(arg=None):";

pub fn b64(s: &str) -> String {
    STANDARD.encode(s)
}

/// Retry policy with millisecond delays so ceiling tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20))
        .with_jitter(false)
}

/// Config pointing at a mock server's `host:port`.
pub fn config_for(host_with_port: &str) -> ClientConfig {
    let (host, port) = host_with_port
        .rsplit_once(':')
        .expect("mock address is host:port");
    ClientConfig::new(host, port.parse().expect("numeric port"))
        .with_timeout(Duration::from_secs(5))
        .with_retry(fast_retry(3))
}

/// One file with two line matches for `def my_function`, two context lines each.
pub fn search_fixture() -> Value {
    json!({
        "Result": {
            "Files": [{
                "FileName": "pkg/util.py",
                "Repository": "github.com/acme/tools",
                "RepositoryID": 7,
                "Version": "9f2c1e0",
                "Language": "Python",
                "Branches": ["HEAD"],
                "LineMatches": [
                    {
                        "Line": b64(FIRST_LINE),
                        "LineStart": 120,
                        "LineEnd": 141,
                        "LineNumber": 12,
                        "Before": b64("import os\n\n"),
                        "After": b64("    return arg\n\n"),
                        "FileName": false,
                        "Score": 501.0,
                        "LineFragments": [
                            {"LineOffset": 0, "Offset": 120, "MatchLength": 15, "SymbolInfo": null}
                        ]
                    },
                    {
                        "Line": b64(SECOND_LINE),
                        "LineStart": 300,
                        "LineEnd": 340,
                        "LineNumber": 30,
                        "Before": b64("\n\n"),
                        "After": b64("    return arg or {}\n\n"),
                        "FileName": false,
                        "Score": 500.0,
                        "LineFragments": [
                            {"LineOffset": 0, "Offset": 300, "MatchLength": 15}
                        ]
                    }
                ],
                "ChunkMatches": null,
                "Checksum": "n5Mx2Q5JX0Q=",
                "Score": 1001.0,
                "Debug": ""
            }],
            "RepoURLs": {"github.com/acme/tools": "https://github.com/acme/tools/blob/{{.Version}}/{{.Path}}"},
            "LineFragments": {"github.com/acme/tools": "#L{{.LineNumber}}"},
            "ContentBytesLoaded": 4096,
            "FileCount": 1,
            "MatchCount": 2,
            "ShardsScanned": 1,
            "Duration": 2_500_000,
            "Progress": {"Priority": 1.0, "MaxPendingPriority": 0.0}
        }
    })
}

pub fn list_fixture() -> Value {
    json!({
        "List": {
            "Repos": [
                {
                    "Repository": {
                        "ID": 7,
                        "Name": "github.com/acme/tools",
                        "URL": "https://github.com/acme/tools",
                        "Branches": [{"Name": "HEAD", "Version": "9f2c1e0"}],
                        "HasSymbols": true,
                        "LatestCommitDate": "2025-07-20T19:29:31Z"
                    },
                    "IndexMetadata": {
                        "IndexTime": "2025-07-21T08:00:00.123456",
                        "LanguageMap": {"Python": 40, "Markdown": 2}
                    },
                    "Stats": {"Shards": 1, "Documents": 42, "IndexBytes": 10240, "ContentBytes": 65536}
                },
                {
                    "Repository": {"ID": 8, "Name": "github.com/acme/site", "Branches": null},
                    "IndexMetadata": null,
                    "Stats": null
                }
            ],
            "Crashes": 0,
            "Stats": {"Repos": 2, "Shards": 2, "Documents": 42, "IndexBytes": 10240, "ContentBytes": 65536}
        }
    })
}

/// Compact listing (`Field: 2`): entries keyed by repository id.
pub fn repos_map_fixture() -> Value {
    json!({
        "List": {
            "Repos": null,
            "ReposMap": {
                "8": {
                    "HasSymbols": false,
                    "Branches": [{"Name": "main", "Version": "a1b2c3d"}],
                    "IndexTimeUnix": 0
                },
                "7": {
                    "HasSymbols": true,
                    "Branches": [{"Name": "HEAD", "Version": "9f2c1e0"}],
                    "IndexTimeUnix": 1_753_084_800
                }
            },
            "Crashes": 0,
            "Stats": {"Repos": 2}
        }
    })
}

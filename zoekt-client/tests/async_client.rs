//! Async client against mock Zoekt servers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    FIRST_LINE, SECOND_LINE, config_for, fast_retry, list_fixture, repos_map_fixture,
    search_fixture,
};
use mockito::{Matcher, Server};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use zoekt_client::{ListField, SearchOptions, ZoektClient, ZoektError};

#[tokio::test]
async fn search_decodes_lines_verbatim() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/search")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "Q": "def my_function",
            "Opts": {"ChunkMatches": false, "NumContextLines": 2}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_fixture().to_string())
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let opts = SearchOptions::new().context_lines(2).chunk_matches(false);
    let result = client.search("def my_function", &opts).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.files.len(), 1);
    let file = &result.files[0];
    assert_eq!(file.repository, "github.com/acme/tools");
    assert_eq!(file.line_matches.len(), 2);
    assert_eq!(file.line_matches[0].decoded_line(), FIRST_LINE);
    assert_eq!(file.line_matches[1].decoded_line(), SECOND_LINE);
    assert_eq!(file.line_matches[0].line, FIRST_LINE.as_bytes());
    assert_eq!(file.line_matches[0].decoded_before(), vec!["import os", ""]);
    assert_eq!(file.line_matches[0].matched_texts(), vec!["def my_function"]);
    assert_eq!(result.match_count(), 2);
    // Options are borrowed, not consumed.
    assert_eq!(opts.context_lines, Some(2));
}

#[tokio::test]
async fn filters_become_query_atoms() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/search")
        .match_body(Matcher::PartialJson(json!({
            "Q": "my_function lang:python repo:acme/tools",
            "Opts": {"MaxDocDisplayCount": 5}
        })))
        .with_status(200)
        .with_body(search_fixture().to_string())
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let opts = SearchOptions::new()
        .language("python")
        .repository("acme/tools")
        .max_matches(5);
    client.search("my_function", &opts).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried_up_to_ceiling() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/search")
        .with_status(503)
        .with_body("upstream unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let err = client
        .search("def my_function", &SearchOptions::new())
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.status(), Some(503));
    assert!(err.is_service_error());
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/search")
        .with_status(404)
        .with_body("{\"Error\":\"no such endpoint\"}")
        .expect(1)
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let err = client
        .search("def my_function", &SearchOptions::new())
        .await
        .unwrap_err();

    mock.assert_async().await;
    match err {
        ZoektError::Service {
            status, message, ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(message.as_deref(), Some("no such endpoint"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_is_a_decode_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/search")
        .with_status(200)
        .with_body("<html>proxy login</html>")
        .expect(1)
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let err = client
        .search("def my_function", &SearchOptions::new())
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ZoektError::Decode(_)));
}

#[tokio::test]
async fn invalid_options_fail_before_any_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let err = client
        .search("x", &SearchOptions::new().max_matches(0))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ZoektError::InvalidOption(_)));
}

#[tokio::test]
async fn close_is_idempotent_and_stops_io() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    assert!(!client.is_closed());
    client.close();
    client.close();
    assert!(client.is_closed());

    let search = client.search("def my_function", &SearchOptions::new()).await;
    let list = client.list_repositories(None).await;

    mock.assert_async().await;
    assert!(matches!(search, Err(ZoektError::ClientClosed)));
    assert!(matches!(list, Err(ZoektError::ClientClosed)));
}

#[tokio::test]
async fn lists_repositories() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/list")
        .match_body(Matcher::Json(json!({"Q": "repo:acme", "Opts": {"Field": 0}})))
        .with_status(200)
        .with_body(list_fixture().to_string())
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let list = client.list_repositories(Some("repo:acme")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(list.len(), 2);
    let tools = list.get("github.com/acme/tools").unwrap();
    assert_eq!(tools.file_count, 42);
    assert_eq!(tools.languages["Python"], 40);
    assert!(tools.has_symbols);
    assert!(tools.last_indexed.is_some());

    let site = list.get("github.com/acme/site").unwrap();
    assert!(site.branches.is_empty());
    assert_eq!(site.last_indexed, None);
    assert_eq!(list.stats.repos, 2);
}

#[tokio::test]
async fn lists_compact_repos_map() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/list")
        .match_body(Matcher::Json(json!({"Q": "repo:acme", "Opts": {"Field": 2}})))
        .with_status(200)
        .with_body(repos_map_fixture().to_string())
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let list = client
        .list_repositories_with(Some("repo:acme"), ListField::ReposMap)
        .await
        .unwrap();

    mock.assert_async().await;
    let ids: Vec<u32> = list.repositories.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![7, 8]);
    let tools = list.by_id(7).unwrap();
    assert!(tools.has_symbols);
    assert_eq!(tools.branches[0].version, "9f2c1e0");
    assert!(tools.last_indexed.is_some());
    assert_eq!(list.by_id(8).unwrap().last_indexed, None);
}

#[tokio::test]
async fn cancelled_search_releases_connection_without_retry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, mut accepted) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        // Accepts and holds connections, never answers.
        while let Ok((stream, _)) = listener.accept().await {
            if accepted_tx.send(stream).is_err() {
                break;
            }
        }
    });

    // 5s per attempt, 5ms to 20ms between attempts.
    let client = ZoektClient::new(config_for(&addr.to_string())).unwrap();
    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        client.search("def my_function", &SearchOptions::new()),
    )
    .await;
    assert!(outcome.is_err(), "search finished before the deadline: {outcome:?}");

    // The server sees the request, then EOF once the dropped call closes the socket.
    let mut conn = accepted.recv().await.unwrap();
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), conn.read_to_end(&mut received))
        .await
        .expect("connection still open after cancellation")
        .unwrap();
    assert!(received.starts_with(b"POST /api/search"));

    // Several backoff windows later, still a single connection.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(accepted.try_recv().is_err());
    assert!(!client.is_closed());
}

#[tokio::test]
async fn batch_keeps_input_order() {
    let mut server = Server::new_async().await;
    let empty = json!({"Result": {"Files": null, "MatchCount": 0}});
    let _alpha = server
        .mock("POST", "/api/search")
        .match_body(Matcher::PartialJson(json!({"Q": "alpha"})))
        .with_status(200)
        .with_body(search_fixture().to_string())
        .create_async()
        .await;
    let _beta = server
        .mock("POST", "/api/search")
        .match_body(Matcher::PartialJson(json!({"Q": "beta"})))
        .with_status(200)
        .with_body(empty.to_string())
        .create_async()
        .await;

    let client = ZoektClient::new(config_for(&server.host_with_port())).unwrap();
    let results = client
        .search_batch(["alpha", "beta"], &SearchOptions::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "alpha");
    assert_eq!(results[0].1.files.len(), 1);
    assert_eq!(results[1].0, "beta");
    assert!(results[1].1.is_empty());
}

#[tokio::test]
async fn shared_client_serves_concurrent_tasks() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/search")
        .with_status(200)
        .with_body(search_fixture().to_string())
        .expect(8)
        .create_async()
        .await;

    let config = config_for(&server.host_with_port()).with_retry(fast_retry(1));
    let client = Arc::new(ZoektClient::new(config).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .search(&format!("query{i}"), &SearchOptions::new())
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.match_count(), 2);
    }
    mock.assert_async().await;
}

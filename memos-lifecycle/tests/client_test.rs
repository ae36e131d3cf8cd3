//! Tests for `MemosClient` against a mock MemOS service.

use memos_lifecycle::config::Credentials;
use memos_lifecycle::memory::{INTERNAL_SERVICE_HEADER, endpoints};
use memos_lifecycle::{MemoryBackend, MemosClient, MemosConfig, MemosError};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> MemosConfig {
    MemosConfig::default()
        .with_api_url(server.uri())
        .with_user_id("alice")
        .with_request_timeout(Duration::from_millis(200))
        .with_backoff_step(Duration::from_millis(10))
}

fn search_body(memories: Value) -> Value {
    json!({
        "code": 200,
        "data": {"text_mem": [{"cube_id": "alice", "memories": memories}]}
    })
}

async fn requests_to(server: &MockServer, endpoint: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .collect()
}

#[tokio::test]
async fn test_search_sends_secret_and_parses_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::SEARCH))
        .and(header(INTERNAL_SERVICE_HEADER, "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
            {"memory": "Prefers Rust", "metadata": {"tags": ["fact"]}},
            {"content": "Works in Berlin"},
            {"id": "no-content"}
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server).with_credentials(Credentials::new("s3cret")))
        .unwrap();
    let records = client.search("user preferences", 5).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].content, "Prefers Rust");
    assert_eq!(records[0].tags, vec!["fact".to_string()]);
    assert_eq!(records[1].content, "Works in Berlin");
    assert!(!records[2].has_content());

    let sent = requests_to(&server, endpoints::SEARCH).await;
    let body: Value = sent[0].body_json().unwrap();
    assert_eq!(body, json!({"query": "user preferences", "user_id": "alice", "top_k": 5}));
}

#[tokio::test]
async fn test_no_secret_no_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([]))))
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    assert!(client.search("anything", 5).await.unwrap().is_empty());

    let sent = requests_to(&server, endpoints::SEARCH).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].headers.get(INTERNAL_SERVICE_HEADER).is_none());
}

#[tokio::test]
async fn test_unexpected_shape_is_empty_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"unexpected": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    assert!(client.search("anything", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_attempts_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::SEARCH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_body(json!([])))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoints::SEARCH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_body(json!([{"memory": "third time"}]))),
        )
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    let started = Instant::now();
    let records = client.search("retry me", 5).await.unwrap();

    assert_eq!(records[0].content, "third time");
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::COMPLETE))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    match client.complete("hello").await {
        Err(MemosError::CallFailed {
            endpoint,
            attempts,
            last,
        }) => {
            assert_eq!(endpoint, endpoints::COMPLETE);
            assert_eq!(attempts, 3);
            assert!(matches!(*last, MemosError::HttpStatus { status: 500 }));
        },
        other => panic!("expected CallFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_json_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::COMPLETE))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(2)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server).with_retries(1)).unwrap();
    assert!(client.complete("hello").await.is_err());
}

#[tokio::test]
async fn test_complete_disables_memory() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::COMPLETE))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"response": "[\"a fact\"]"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    assert_eq!(client.complete("extract").await.unwrap(), "[\"a fact\"]");

    let sent = requests_to(&server, endpoints::COMPLETE).await;
    let body: Value = sent[0].body_json().unwrap();
    assert_eq!(body["enable_memory"], false);
    assert_eq!(body["user_id"], "alice");
}

#[tokio::test]
async fn test_add_is_fire_and_forget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::ADD))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 200}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    let started = Instant::now();
    client.add("Lives in Berlin".into(), vec!["auto_capture".into(), "fact".into()]);
    client.add("Prefers tabs".into(), vec!["auto_capture".into(), "fact".into()]);
    assert!(started.elapsed() < Duration::from_millis(50));

    assert!(client.shutdown(Duration::from_secs(5)).await);
    let stats = client.writer_stats();
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.pending, 0);

    let sent = requests_to(&server, endpoints::ADD).await;
    let mut contents: Vec<String> = sent
        .iter()
        .map(|request| {
            let body: Value = request.body_json().unwrap();
            assert_eq!(body["async_mode"], "async");
            assert_eq!(body["custom_tags"], json!(["auto_capture", "fact"]));
            body["messages"].as_str().unwrap().to_string()
        })
        .collect();
    contents.sort();
    assert_eq!(contents, vec!["Lives in Berlin", "Prefers tabs"]);
}

#[tokio::test]
async fn test_failed_add_is_counted_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::ADD))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = MemosClient::new(config_for(&server)).unwrap();
    client.add("doomed".into(), vec![]);

    assert!(client.shutdown(Duration::from_secs(5)).await);
    assert_eq!(client.writer_stats().failed, 1);
}

//! End-to-end fetch tests against a mock HTTP server.
//!
//! Exercises the full check-limit, rotate, send, log sequence using wiremock
//! so no real network is touched.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shroud::{Agent, IDENTITY_POOL};

#[tokio::test]
async fn test_fetch_success_returns_body_and_logs_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello world"))
        .mount(&mock_server)
        .await;

    let agent = Agent::new("9.9.9.9");
    let url = format!("{}/page", mock_server.uri());
    let body = agent.fetch(&url).await;

    assert_eq!(body, "hello world");

    let history = agent.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source, "9.9.9.9");
    assert_eq!(history[0].url, url);
    assert_eq!(history[0].status, "200");
    // Rotation is on by default, so the logged identity came from the pool.
    assert!(IDENTITY_POOL.contains(&history[0].identity.as_str()));
}

#[tokio::test]
async fn test_fetch_sends_fixed_identity_when_rotation_disabled() {
    let mock_server = MockServer::start().await;

    // Only matches when the User-Agent header carries the fixed identity.
    Mock::given(method("GET"))
        .and(path("/probe"))
        .and(header("user-agent", "ProbeBot/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let agent = Agent::new("9.9.9.9");
    agent.disable_rotation().await;
    agent.set_identity("ProbeBot/1.0").await.unwrap();

    let url = format!("{}/probe", mock_server.uri());
    assert_eq!(agent.fetch(&url).await, "ok");

    let history = agent.history().await;
    assert_eq!(history[0].identity, "ProbeBot/1.0");
    // The identity survives the request unchanged.
    assert_eq!(agent.identity().await, "ProbeBot/1.0");
}

#[tokio::test]
async fn test_fetch_failure_logs_and_returns_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let agent = Agent::new("9.9.9.9");
    let url = format!("{}/missing", mock_server.uri());

    assert_eq!(agent.fetch(&url).await, "");

    let history = agent.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "404");
}

#[tokio::test]
async fn test_fetch_transport_error_logs_status_zero() {
    // Port 1 on loopback: connection refused, nothing listens there.
    let agent = Agent::new("9.9.9.9");
    assert_eq!(agent.fetch("http://127.0.0.1:1/").await, "");

    let history = agent.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "0");
}

#[tokio::test]
async fn test_empty_source_agent_still_logs_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    // An empty source falls back to the loopback default, so the attempt
    // is recorded like any other.
    let agent = Agent::new("");
    let url = format!("{}/page", mock_server.uri());
    assert_eq!(agent.fetch(&url).await, "ok");

    let history = agent.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source, shroud::DEFAULT_SOURCE);
}

#[tokio::test]
async fn test_rate_limited_fetch_skips_transport() {
    let mock_server = MockServer::start().await;

    // expect(1) verifies the denied second fetch never reached the server.
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let agent = Agent::new("9.9.9.9");
    agent.set_limit(1).await.unwrap();

    let url = format!("{}/limited", mock_server.uri());
    assert_eq!(agent.fetch(&url).await, "first");
    assert_eq!(agent.history_len().await, 1);

    // Denied before any transport call; history is unchanged.
    assert_eq!(agent.fetch(&url).await, "");
    assert_eq!(agent.history_len().await, 1);
}

#[tokio::test]
async fn test_dump_and_reload_into_fresh_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let agent = Agent::new("9.9.9.9");
    agent.fetch(&format!("{}/a", mock_server.uri())).await;
    agent.fetch(&format!("{}/b", mock_server.uri())).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.tsv");
    agent.dump_history(&path).await.unwrap();

    let restored = Agent::new("9.9.9.9");
    assert_eq!(restored.load_history(&path).await.unwrap(), 2);
    assert_eq!(restored.history().await, agent.history().await);
}

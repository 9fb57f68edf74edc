//! Integration tests for request execution, goal fetching, and dispatch
//! against a wiremock server.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use megaverse::{
    fetch_goal, run, ConfigOverrides, Dispatcher, GoalMatrix, MegaverseClient, MegaverseConfig,
    MegaverseError, RequestPayload, RetryPolicy,
};

// ─────────────────────── helpers ───────────────────────

/// Short delays keep the backoff tests fast.
fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(50),
    }
}

fn client(max_retries: u32) -> MegaverseClient {
    MegaverseClient::new(fast_policy(max_retries), None)
}

fn payload(row: usize, column: usize) -> RequestPayload {
    RequestPayload {
        row,
        column,
        candidate_id: "abc".to_string(),
        direction: None,
        color: None,
    }
}

fn matrix(rows: &[&[&str]]) -> GoalMatrix {
    GoalMatrix::new(
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

/// (path, body) of every request the server saw, in arrival order.
async fn received(server: &MockServer) -> Vec<(String, Value)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            (
                r.url.path().to_string(),
                serde_json::from_slice(&r.body).unwrap_or(Value::Null),
            )
        })
        .collect()
}

// ═══════════════════════════════════════════════════════
// EXECUTOR
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_success_sends_json_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/polyanets"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"row": 2, "column": 3, "candidateId": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/polyanets", server.uri());
    let body = client(3).execute(&url, &payload(2, 3)).await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = format!("{}/polyanets", server.uri());
    let body = client(3).execute(&url, &payload(0, 0)).await.unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_non_json_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let url = format!("{}/polyanets", server.uri());
    let err = client(3).execute(&url, &payload(0, 0)).await.unwrap_err();
    assert!(matches!(err, MegaverseError::Decode(_)));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_two_rate_limits_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"placed": true})))
        .mount(&server)
        .await;

    let url = format!("{}/soloons", server.uri());
    let started = Instant::now();
    let body = client(3).execute(&url, &payload(0, 0)).await.unwrap();

    assert_eq!(body, json!({"placed": true}));
    assert_eq!(request_count(&server).await, 3);
    // 50ms then 100ms of backoff.
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_rate_limited_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let url = format!("{}/comeths", server.uri());
    let err = client(3).execute(&url, &payload(0, 0)).await.unwrap_err();

    match err {
        MegaverseError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*last, MegaverseError::Http { status: 429 }));
        }
        other => panic!("expected RetriesExhausted, got {other}"),
    }
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_server_error_retried_then_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let url = format!("{}/polyanets", server.uri());
    let err = client(2).execute(&url, &payload(0, 0)).await.unwrap_err();

    assert!(matches!(err, MegaverseError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_server_error_recovers_without_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let slow = MegaverseClient::new(
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(30),
        },
        None,
    );
    let url = format!("{}/polyanets", server.uri());
    let started = Instant::now();
    slow.execute(&url, &payload(0, 0)).await.unwrap();

    assert_eq!(request_count(&server).await, 2);
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test]
async fn test_transport_error_exhausts() {
    // Bind then release a port so nothing is listening on it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{port}/polyanets");

    let err = client(2).execute(&url, &payload(0, 0)).await.unwrap_err();
    match err {
        MegaverseError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, MegaverseError::Transport(_)));
        }
        other => panic!("expected RetriesExhausted, got {other}"),
    }
}

// ═══════════════════════════════════════════════════════
// GOAL FETCHER
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_fetch_goal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/abc/goal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "goal": [["SPACE", "POLYANET"], ["RED_SOLOON", "SPACE"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/map/abc/goal", server.uri());
    let goal = fetch_goal(&client(3), &url).await.unwrap();
    assert_eq!(goal, matrix(&[&["SPACE", "POLYANET"], &["RED_SOLOON", "SPACE"]]));
}

#[tokio::test]
async fn test_fetch_goal_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/map/abc/goal", server.uri());
    let err = fetch_goal(&client(3), &url).await.unwrap_err();
    assert!(matches!(err, MegaverseError::GoalFetch(_)));
}

#[tokio::test]
async fn test_fetch_goal_bad_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"map": []})))
        .mount(&server)
        .await;

    let url = format!("{}/map/abc/goal", server.uri());
    let err = fetch_goal(&client(3), &url).await.unwrap_err();
    assert!(matches!(err, MegaverseError::GoalFetch(_)));
}

// ═══════════════════════════════════════════════════════
// DISPATCHER
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_dispatch_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(client(3), &server.uri(), "abc");
    let goal = matrix(&[&["POLYANET", "SPACE"], &["BLUE_SOLOON", "UP_COMETH"]]);
    dispatcher.run(&goal).await;

    assert_eq!(
        received(&server).await,
        vec![
            (
                "/polyanets".to_string(),
                json!({"row": 0, "column": 0, "candidateId": "abc"})
            ),
            (
                "/soloons".to_string(),
                json!({"row": 1, "column": 0, "candidateId": "abc", "color": "blue"})
            ),
            (
                "/comeths".to_string(),
                json!({"row": 1, "column": 1, "candidateId": "abc", "direction": "up"})
            ),
        ]
    );
}

#[tokio::test]
async fn test_dispatch_continues_after_failed_cell() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/soloons"))
        .respond_with(ResponseTemplate::new(429))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(client(1), &server.uri(), "abc");
    let goal = matrix(&[&["WHITE_SOLOON", "POLYANET"], &["SPACE", "DOWN_COMETH"]]);
    dispatcher.run(&goal).await;

    let paths: Vec<String> = received(&server).await.into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths, vec!["/soloons", "/soloons", "/polyanets", "/comeths"]);
}

#[tokio::test]
async fn test_dispatch_skips_unrecognized_labels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(client(3), &server.uri(), "abc");
    let goal = matrix(&[&["ASTEROID", "SPACE", "POLYANET"]]);
    dispatcher.run(&goal).await;
}

#[tokio::test]
async fn test_run_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/abc/goal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "goal": [["POLYANET", "SPACE"], ["SPACE", "LEFT_COMETH"]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let overrides = ConfigOverrides {
        goal_url: Some(format!("{}/map/abc/goal", server.uri())),
        base_url: Some(format!("{}/", server.uri())),
        candidate_id: Some("abc".to_string()),
        base_delay_ms: Some(10),
        ..ConfigOverrides::default()
    };
    let config = MegaverseConfig::resolve(overrides, |_| None).unwrap();
    run(&config).await.unwrap();

    let paths: Vec<String> = received(&server).await.into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths, vec!["/map/abc/goal", "/polyanets", "/comeths"]);
}

#[tokio::test]
async fn test_run_fails_on_goal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let overrides = ConfigOverrides {
        goal_url: Some(format!("{}/map/abc/goal", server.uri())),
        base_url: Some(server.uri()),
        candidate_id: Some("abc".to_string()),
        ..ConfigOverrides::default()
    };
    let config = MegaverseConfig::resolve(overrides, |_| None).unwrap();
    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, MegaverseError::GoalFetch(_)));
}

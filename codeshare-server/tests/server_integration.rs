//! End-to-end tests: both listeners running, a fake execution backend, and
//! real participants on the sync channel.

use std::sync::Arc;
use axum::{http::StatusCode, routing::post, Router};
use codeshare_collab::client::{SyncClient, SyncEvent};
use codeshare_collab::session::SessionStore;
use codeshare_exec::RunClient;
use codeshare_server::{App, Config};
use tokio::sync::mpsc::Receiver;
use tokio::time::{timeout, Duration, Instant};

/// Fake backend that waits `delay` and then answers with `status`/`body`.
async fn start_backend(status: StatusCode, body: &'static str, delay: Duration) -> String {
    let app = Router::new().route(
        "/execute",
        post(move || async move {
            tokio::time::sleep(delay).await;
            (status, body)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}/execute")
}

/// Start the app on ephemeral ports; returns (ws url, http base, session).
async fn start_app(execution_endpoint: String) -> (String, String, Arc<SessionStore>) {
    let mut config = Config::default();
    config.sync.bind_addr = "127.0.0.1:0".to_string();
    config.http_addr = "127.0.0.1:0".to_string();
    config.execution_endpoint = execution_endpoint;

    let app = App::bind(&config).await.unwrap();
    let ws_url = format!("ws://{}", app.sync_addr().unwrap());
    let http_base = format!("http://{}", app.http_addr().unwrap());
    let store = app.store().clone();
    tokio::spawn(async move {
        app.serve().await.unwrap();
    });
    (ws_url, http_base, store)
}

async fn connect(url: &str) -> (SyncClient, Receiver<SyncEvent>) {
    let mut client = SyncClient::new(url);
    let mut events = client.take_event_rx().unwrap();
    client.connect().await.unwrap();
    next_update(&mut events).await.expect("initial snapshot");
    (client, events)
}

async fn next_update(events: &mut Receiver<SyncEvent>) -> Option<String> {
    loop {
        match timeout(Duration::from_secs(2), events.recv()).await {
            Ok(Some(SyncEvent::RemoteUpdate(content))) => return Some(content),
            Ok(Some(_)) => continue,
            _ => return None,
        }
    }
}

const HELLO: &str = r#"{"language":"python","version":"3.10.0","run":{"stdout":"hello\n","stderr":"","output":"hello\n","code":0,"signal":null}}"#;

#[tokio::test]
async fn test_run_relays_backend_result() {
    let backend = start_backend(StatusCode::OK, HELLO, Duration::ZERO).await;
    let (_, http, _) = start_app(backend).await;

    let client = RunClient::new(&http).unwrap();
    let result = client.run("python3", "print('hello')").await.unwrap();
    assert_eq!(result.display_text(), "hello\n");
    assert_eq!(result.version.as_deref(), Some("3.10.0"));
}

#[tokio::test]
async fn test_backend_failure_becomes_generic_500() {
    let backend = start_backend(
        StatusCode::BAD_REQUEST,
        r#"{"message":"cobol-* runtime is unknown"}"#,
        Duration::ZERO,
    )
    .await;
    let (_, http, _) = start_app(backend).await;

    let response = reqwest::Client::new()
        .post(format!("{http}/run"))
        .json(&serde_json::json!({"language": "cobol", "code": "DISPLAY 'X'."}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"error": "Execution failed"}));
}

#[tokio::test]
async fn test_unreachable_backend_renders_diagnostic() {
    let (_, http, _) = start_app("http://127.0.0.1:9/execute".to_string()).await;

    let text = RunClient::new(&http).unwrap().run_display("python3", "print(1)").await;
    assert_eq!(text, "Server error (status 500): Execution failed");
}

#[tokio::test]
async fn test_unreadable_request_body_is_500() {
    let backend = start_backend(StatusCode::OK, HELLO, Duration::ZERO).await;
    let (_, http, _) = start_app(backend).await;

    let response = reqwest::Client::new()
        .post(format!("{http}/run"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
}

#[tokio::test]
async fn test_health() {
    let (_, http, _) = start_app("http://127.0.0.1:9/execute".to_string()).await;
    let response = reqwest::get(format!("{http}/health")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_slow_execution_does_not_block_sync() {
    let backend = start_backend(StatusCode::OK, HELLO, Duration::from_millis(800)).await;
    let (ws, http, store) = start_app(backend).await;

    let (a, _events_a) = connect(&ws).await;
    let (_b, mut events_b) = connect(&ws).await;

    let runner = RunClient::new(&http).unwrap();
    let run = tokio::spawn(async move { runner.run_display("python3", "print('hello')").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    a.send_edit("edited during run").await.unwrap();
    assert_eq!(next_update(&mut events_b).await.as_deref(), Some("edited during run"));
    assert!(started.elapsed() < Duration::from_millis(500));

    assert_eq!(run.await.unwrap(), "hello\n");
    assert_eq!(&*store.content().await, "edited during run");
}

#[tokio::test]
async fn test_run_result_is_not_broadcast() {
    let backend = start_backend(StatusCode::OK, HELLO, Duration::ZERO).await;
    let (ws, http, _) = start_app(backend).await;
    let (_a, mut events_a) = connect(&ws).await;

    let text = RunClient::new(&http).unwrap().run_display("python3", "print('hello')").await;
    assert_eq!(text, "hello\n");

    let quiet = timeout(Duration::from_millis(150), async {
        loop {
            if let Some(SyncEvent::RemoteUpdate(content)) = events_a.recv().await {
                return content;
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "participant saw {quiet:?}");
}

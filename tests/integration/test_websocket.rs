//! Integration tests for the workflow event stream.
//!
//! A real server is bound to a local port with a scripted generation client;
//! WebSocket clients observe the events of generation runs.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use landingwise_server::{create_router, AppState, Project, ProjectStore, USER_ID_HEADER};
use landingwise_workflow::{Config, ScriptedClient, WorkflowEvent};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

const VALID_HTML: &str = r#"<html><head><script src="https://cdn.tailwindcss.com"></script></head><body><form data-waitlist="true"><input type="email"></form></body></html>"#;

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server and returns its base address (`127.0.0.1:port`).
async fn spawn_test_server(client: ScriptedClient) -> (String, AppState) {
    let state = AppState::new(
        Config::default(),
        ProjectStore::in_memory(),
        Arc::new(client),
    );
    let router = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (addr.to_string(), state)
}

/// Connects a WebSocket client and consumes the `connected` greeting.
async fn connect_client(addr: &str) -> WsClient {
    let (mut ws_stream, _) = connect_async(format!("ws://{addr}/api/events"))
        .await
        .expect("Failed to connect to WebSocket");

    let greeting = receive_json(&mut ws_stream).await;
    assert_eq!(greeting["event"], "connected");
    ws_stream
}

/// Receives the next text message as JSON, answering pings on the way.
async fn receive_json(client: &mut WsClient) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse message");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

async fn receive_event(client: &mut WsClient) -> WorkflowEvent {
    serde_json::from_value(receive_json(client).await).expect("Failed to parse event")
}

/// Creates a project and runs one generation over HTTP.
async fn create_and_generate(addr: &str) -> Project {
    let http = reqwest::Client::new();
    let project: Project = http
        .post(format!("http://{addr}/api/projects"))
        .header(USER_ID_HEADER, "alice")
        .json(&json!({"title": "Event Test", "prompt": "A newsletter"}))
        .send()
        .await
        .expect("create request failed")
        .json()
        .await
        .expect("create response was not a project");

    let status = http
        .post(format!("http://{addr}/api/projects/{}/generate", project.id))
        .header(USER_ID_HEADER, "alice")
        .json(&json!({"prompt": "Make it bold"}))
        .send()
        .await
        .expect("generate request failed")
        .status();
    assert!(status.is_success());
    project
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_client_receives_connected_event_on_connect() {
    let (addr, _state) = spawn_test_server(ScriptedClient::always(VALID_HTML)).await;
    let (mut client, _) = connect_async(format!("ws://{addr}/api/events"))
        .await
        .expect("Failed to connect");

    let greeting = receive_json(&mut client).await;
    assert_eq!(greeting["event"], "connected");
    assert!(greeting["payload"]["version"].is_string());
}

// ============================================================================
// Event Streaming Tests
// ============================================================================

#[tokio::test]
async fn test_generation_run_streams_events_in_order() {
    let (addr, _state) = spawn_test_server(ScriptedClient::always(VALID_HTML)).await;
    let mut client = connect_client(&addr).await;

    let project = create_and_generate(&addr).await;
    let run_id = project.id.to_string();

    let mut names = Vec::new();
    loop {
        let event = receive_event(&mut client).await;
        assert_eq!(event.run_id(), run_id);
        names.push(event.event_name());
        if let WorkflowEvent::RunComplete(payload) = event {
            assert!(payload.success);
            assert_eq!(payload.iterations, 1);
            break;
        }
    }

    assert_eq!(
        names,
        vec!["run_started", "iteration_start", "validation", "run_complete"]
    );
}

#[tokio::test]
async fn test_multiple_clients_receive_same_events() {
    let (addr, _state) = spawn_test_server(
        ScriptedClient::new()
            .then_ok("<p>draft</p>")
            .then_ok(VALID_HTML),
    )
    .await;
    let mut first = connect_client(&addr).await;
    let mut second = connect_client(&addr).await;

    create_and_generate(&addr).await;

    for client in [&mut first, &mut second] {
        let mut validations = 0;
        loop {
            match receive_event(client).await {
                WorkflowEvent::Validation(_) => validations += 1,
                WorkflowEvent::RunComplete(payload) => {
                    assert!(payload.success);
                    assert_eq!(payload.iterations, 2);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(validations, 2);
    }
}

#[tokio::test]
async fn test_shutdown_closes_socket() {
    let (addr, state) = spawn_test_server(ScriptedClient::always(VALID_HTML)).await;
    let mut client = connect_client(&addr).await;

    state.shutdown.cancel();

    let closed = timeout(Duration::from_secs(5), async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return true,
                Ok(_) => {}
            }
        }
        true
    })
    .await
    .expect("Timeout waiting for close");
    assert!(closed);
}

//! End-to-end tests of the generation workflow.
//!
//! The real `OpenRouterClient` is pointed at a local axum server that mimics
//! the chat-completions endpoint, so the HTTP mapping, the validation loop
//! and the corrective pass are exercised together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use landingwise_workflow::{
    validate_html, Config, GenerationConfig, GenerationContext, LandingPageGenerator,
    OpenRouterClient, RunOptions, ScriptedClient, Style, TransportFallback, WorkflowConfig,
    FALLBACK_HTML, MAX_ITERATIONS_ERROR,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const VALID_HTML: &str = r#"<!DOCTYPE html><html><head><script src="https://cdn.tailwindcss.com"></script></head><body><h1>Launch</h1><form data-waitlist="true"><input type="email" name="email"></form></body></html>"#;

// ============================================================================
// Mock chat-completions endpoint
// ============================================================================

#[derive(Clone)]
struct MockEndpoint {
    replies: Arc<Vec<(StatusCode, Value)>>,
    hits: Arc<AtomicUsize>,
    bodies: Arc<tokio::sync::Mutex<Vec<Value>>>,
}

async fn completions(
    State(mock): State<MockEndpoint>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.bodies.lock().await.push(body);
    let hit = mock.hits.fetch_add(1, Ordering::SeqCst);
    let index = hit.min(mock.replies.len() - 1);
    let (status, value) = mock.replies[index].clone();
    (status, Json(value))
}

fn completion(content: &str) -> (StatusCode, Value) {
    (
        StatusCode::OK,
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}),
    )
}

/// Starts the mock and returns a generation config pointing at it.
async fn spawn_mock(replies: Vec<(StatusCode, Value)>) -> (GenerationConfig, MockEndpoint) {
    let mock = MockEndpoint {
        replies: Arc::new(replies),
        hits: Arc::new(AtomicUsize::new(0)),
        bodies: Arc::new(tokio::sync::Mutex::new(Vec::new())),
    };
    let router = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Mock failed");
    });

    let config = GenerationConfig {
        base_url: format!("http://{addr}/v1"),
        request_timeout_secs: 5,
        ..GenerationConfig::default()
    };
    (config, mock)
}

fn generator_for(config: &GenerationConfig, workflow: WorkflowConfig) -> LandingPageGenerator {
    let client = OpenRouterClient::new(config, "test-key").expect("Failed to build client");
    LandingPageGenerator::new(Arc::new(client), workflow)
}

// ============================================================================
// Over HTTP
// ============================================================================

#[tokio::test]
async fn test_valid_first_draft_over_http() {
    let (config, mock) = spawn_mock(vec![completion(VALID_HTML)]).await;
    let generator = generator_for(&config, WorkflowConfig::default());

    let result = generator
        .generate_landing_page("A coffee subscription", GenerationContext::new(""))
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.html, VALID_HTML);

    let bodies = mock.bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], config.model.as_str());
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
    assert_eq!(bodies[0]["messages"][1]["role"], "user");
    assert_eq!(bodies[0]["messages"][1]["content"], "A coffee subscription");
}

#[tokio::test]
async fn test_corrective_pass_over_http() {
    let (config, mock) = spawn_mock(vec![
        completion("<div>No structure here</div>"),
        completion(VALID_HTML),
    ])
    .await;
    let generator = generator_for(&config, WorkflowConfig::default());

    let result = generator
        .generate_landing_page("A book club", GenerationContext::new(""))
        .await;

    assert!(result.success);
    assert_eq!(result.iterations, 2);
    assert!(result.errors.is_empty());

    let bodies = mock.bodies.lock().await;
    let corrective = bodies[1]["messages"][0]["content"]
        .as_str()
        .expect("corrective prompt is a string");
    assert!(corrective.contains("<div>No structure here</div>"));
    assert!(corrective.contains("Missing proper HTML structure"));
}

#[tokio::test]
async fn test_rate_limited_then_recovered() {
    let (config, _mock) = spawn_mock(vec![
        (StatusCode::TOO_MANY_REQUESTS, json!({"error": "slow down"})),
        completion(VALID_HTML),
    ])
    .await;
    let generator = generator_for(&config, WorkflowConfig::default());

    let result = generator
        .generate_landing_page("A podcast", GenerationContext::new(""))
        .await;

    assert!(result.success);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Generation error:"));
}

#[tokio::test]
async fn test_malformed_body_exhausts_iterations() {
    let (config, mock) = spawn_mock(vec![(StatusCode::OK, json!({"unexpected": true}))]).await;
    let generator = generator_for(&config, WorkflowConfig::default());

    let result = generator
        .generate_landing_page("A gym", GenerationContext::new(""))
        .await;

    assert!(!result.success);
    assert_eq!(result.iterations, 3);
    assert_eq!(mock.hits.load(Ordering::SeqCst), 3);
    assert_eq!(result.errors.last().map(String::as_str), Some(MAX_ITERATIONS_ERROR));
}

#[tokio::test]
async fn test_fallback_document_policy_over_http() {
    let (config, mock) = spawn_mock(vec![(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "boom"}),
    )])
    .await;
    let workflow = WorkflowConfig {
        transport_fallback: TransportFallback::FallbackDocument,
        ..WorkflowConfig::default()
    };
    let generator = generator_for(&config, workflow);

    let result = generator
        .generate_landing_page("A bakery", GenerationContext::new(""))
        .await;

    assert!(result.success);
    assert_eq!(result.html, FALLBACK_HTML);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Scripted client
// ============================================================================

#[tokio::test]
async fn test_refine_keeps_current_page_on_failure() {
    let generator = LandingPageGenerator::new(
        Arc::new(ScriptedClient::always("<p>broken</p>")),
        WorkflowConfig::default(),
    );

    let result = generator
        .refine_content(VALID_HTML, "Add a pricing section", Vec::new())
        .await;

    assert!(!result.success);
    assert_eq!(result.html, VALID_HTML);
}

#[tokio::test]
async fn test_adjust_style_produces_valid_page() {
    let client = Arc::new(ScriptedClient::always(VALID_HTML));
    let generator = LandingPageGenerator::new(client.clone(), WorkflowConfig::default());

    let result = generator
        .adjust_style(VALID_HTML, "Softer colors", Style::Minimal)
        .await;

    assert!(result.success);
    assert!(validate_html(&result.html).is_basic_valid());
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0][0].content.contains("minimal"));
}

#[tokio::test]
async fn test_cancelled_run_stops_without_calls() {
    let client = Arc::new(ScriptedClient::always(VALID_HTML));
    let generator = LandingPageGenerator::new(client.clone(), WorkflowConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = generator
        .run(
            landingwise_workflow::GenerationRequest::Compose(GenerationContext::new("x")),
            RunOptions::new("cancelled").with_cancel(cancel),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.iterations, 0);
    assert_eq!(client.call_count(), 0);
    assert_eq!(result.errors, vec!["Generation cancelled".to_string()]);
}

#[tokio::test]
async fn test_deadline_bounds_slow_client() {
    let client = ScriptedClient::always(VALID_HTML).with_delay(Duration::from_secs(5));
    let generator = LandingPageGenerator::new(Arc::new(client), WorkflowConfig::default());

    let started = std::time::Instant::now();
    let result = generator
        .run(
            landingwise_workflow::GenerationRequest::Compose(GenerationContext::new("x")),
            RunOptions::new("slow").with_timeout(Duration::from_millis(100)),
        )
        .await;

    assert!(!result.success);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(result.errors[0].starts_with("Generation deadline exceeded"));
}

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    config.validate().expect("default config should validate");
    assert_eq!(config.workflow.max_iterations, 3);
}

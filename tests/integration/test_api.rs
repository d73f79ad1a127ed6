//! End-to-end tests of the HTTP API over a real listener.
//!
//! Covers the owner flow (create, generate, publish, export) and the public
//! flow (view the page, join the waitlist) with a scripted generation client.

use std::path::Path;
use std::sync::Arc;

use landingwise_publish::slugify;
use landingwise_server::{
    create_router, AppState, GenerateResponse, JoinWaitlistResponse, Project, ProjectDetail,
    ProjectStatus, ProjectStore, PublicPage, WaitlistEntry, USER_ID_HEADER,
};
use landingwise_workflow::{Config, ScriptedClient, Style};
use reqwest::StatusCode;
use serde_json::{json, Value};

const VALID_HTML: &str = r#"<!DOCTYPE html><html><head><script src="https://cdn.tailwindcss.com"></script></head><body><h1>Orbit</h1><form data-waitlist="true"><input type="email" name="email"><button>Join</button></form></body></html>"#;

/// Test server handle with a client preconfigured for one owner.
struct TestApp {
    base: String,
    http: reqwest::Client,
}

impl TestApp {
    async fn spawn(store: ProjectStore, client: ScriptedClient) -> Self {
        let state = AppState::new(Config::default(), store, Arc::new(client));
        let router = create_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
        }
    }

    async fn in_memory(client: ScriptedClient) -> Self {
        Self::spawn(ProjectStore::in_memory(), client).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn owner_post(&self, user: &str, path: &str, body: Value) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .header(USER_ID_HEADER, user)
            .json(&body)
            .send()
            .await
            .expect("request failed")
    }

    async fn owner_get(&self, user: &str, path: &str) -> reqwest::Response {
        self.http
            .get(self.url(path))
            .header(USER_ID_HEADER, user)
            .send()
            .await
            .expect("request failed")
    }

    async fn create_project(&self, user: &str, title: &str) -> Project {
        let response = self
            .owner_post(
                user,
                "/api/projects",
                json!({"title": title, "prompt": "A waitlist for a space telescope app", "style": "creative"}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("not a project")
    }

    async fn generate(&self, user: &str, project: &Project, prompt: &str) -> GenerateResponse {
        let response = self
            .owner_post(
                user,
                &format!("/api/projects/{}/generate", project.id),
                json!({"prompt": prompt}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("not a generate response")
    }

    async fn publish(&self, user: &str, project: &Project) -> reqwest::Response {
        self.owner_post(
            user,
            &format!("/api/projects/{}/publish", project.id),
            json!({}),
        )
        .await
    }
}

// ============================================================================
// Owner flow
// ============================================================================

#[tokio::test]
async fn test_full_landing_page_lifecycle() {
    let app = TestApp::in_memory(ScriptedClient::always(VALID_HTML)).await;

    let project = app.create_project("alice", "Orbit Launch").await;
    assert_eq!(project.slug, slugify("Orbit Launch", &project.id.to_string()));
    assert_eq!(project.metadata.style, Style::Creative);

    let generated = app.generate("alice", &project, "Dark theme please").await;
    assert!(generated.generation_result.success);
    assert_eq!(generated.project.html_content.as_deref(), Some(VALID_HTML));

    let published: Project = app
        .publish("alice", &project)
        .await
        .json()
        .await
        .expect("not a project");
    assert_eq!(published.status, ProjectStatus::Published);

    // Public view
    let page: PublicPage = app
        .http
        .get(app.url(&format!("/api/pages/{}", project.slug)))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("not a page");
    assert_eq!(page.title, "Orbit Launch");
    assert_eq!(page.metadata.style, Style::Creative);

    let html_response = app
        .http
        .get(app.url(&format!("/p/{}", project.slug)))
        .send()
        .await
        .expect("request failed");
    let content_type = html_response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    let html = html_response.text().await.expect("no body");
    let script_at = html.find("<script>").expect("waitlist script injected");
    assert!(script_at < html.rfind("</body>").expect("body kept"));

    // Visitors join
    for email in ["first@example.com", "second@example.com"] {
        let joined: JoinWaitlistResponse = app
            .http
            .post(app.url("/api/waitlist"))
            .json(&json!({"projectId": project.id, "email": email, "metadata": {"source": "test"}}))
            .send()
            .await
            .expect("request failed")
            .json()
            .await
            .expect("not a join response");
        assert!(joined.success);
    }

    let entries: Vec<WaitlistEntry> = app
        .owner_get("alice", &format!("/api/projects/{}/waitlist?limit=1", project.id))
        .await
        .json()
        .await
        .expect("not entries");
    assert_eq!(entries.len(), 1);

    let export = app
        .owner_get(
            "alice",
            &format!("/api/projects/{}/waitlist/export?format=csv", project.id),
        )
        .await;
    assert_eq!(export.status(), StatusCode::OK);
    let disposition = export
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains(".csv"));
    let csv = export.text().await.expect("no body");
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("first@example.com"));

    let json_export: Value = app
        .owner_get(
            "alice",
            &format!("/api/projects/{}/waitlist/export", project.id),
        )
        .await
        .json()
        .await
        .expect("not json");
    assert_eq!(json_export.as_array().map(Vec::len), Some(2));
    assert!(json_export[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_refinement_uses_current_page() {
    let client = ScriptedClient::always(VALID_HTML);
    let app = TestApp::in_memory(client).await;
    let project = app.create_project("alice", "Refine Me").await;

    app.generate("alice", &project, "First draft").await;
    let second = app.generate("alice", &project, "Add testimonials").await;
    assert!(second.generation_result.success);

    let detail: ProjectDetail = app
        .owner_get("alice", &format!("/api/projects/{}", project.id))
        .await
        .json()
        .await
        .expect("not a detail");
    let conversation = detail.latest_conversation.expect("conversation saved");
    assert_eq!(conversation.messages[0].content, "Add testimonials");
}

#[tokio::test]
async fn test_failed_generation_keeps_draft_unpublishable() {
    let app = TestApp::in_memory(ScriptedClient::always("<p>nope</p>")).await;
    let project = app.create_project("alice", "Broken").await;

    let generated = app.generate("alice", &project, "anything").await;
    assert!(!generated.generation_result.success);
    assert_eq!(generated.generation_result.iterations, 3);

    let response = app.publish("alice", &project).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("not json");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_projects_are_private_to_their_owner() {
    let app = TestApp::in_memory(ScriptedClient::always(VALID_HTML)).await;
    let project = app.create_project("alice", "Secret").await;
    app.create_project("bob", "Bob's").await;

    let alice: Vec<Project> = app
        .owner_get("alice", "/api/projects")
        .await
        .json()
        .await
        .expect("not projects");
    assert_eq!(alice.len(), 1);

    let response = app
        .owner_get("bob", &format!("/api/projects/{}", project.id))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let anonymous = app
        .http
        .get(app.url("/api/projects"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_waitlist_requires_published_page() {
    let app = TestApp::in_memory(ScriptedClient::always(VALID_HTML)).await;
    let project = app.create_project("alice", "Unreleased").await;

    let response = app
        .http
        .post(app.url("/api/waitlist"))
        .json(&json!({"projectId": project.id, "email": "early@example.com"}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let page = app
        .http
        .get(app.url(&format!("/api/pages/{}", project.slug)))
        .send()
        .await
        .expect("request failed");
    assert_eq!(page.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Persistence
// ============================================================================

async fn open_store(path: &Path) -> ProjectStore {
    ProjectStore::open(path).await.expect("store should open")
}

#[tokio::test]
async fn test_projects_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state/store.json");

    let first = TestApp::spawn(open_store(&path).await, ScriptedClient::always(VALID_HTML)).await;
    let project = first.create_project("alice", "Durable").await;
    first.generate("alice", &project, "Go").await;
    first.publish("alice", &project).await;
    assert!(path.exists());

    let second = TestApp::spawn(open_store(&path).await, ScriptedClient::always(VALID_HTML)).await;
    let page = second
        .http
        .get(second.url(&format!("/p/{}", project.slug)))
        .send()
        .await
        .expect("request failed");
    assert_eq!(page.status(), StatusCode::OK);
}

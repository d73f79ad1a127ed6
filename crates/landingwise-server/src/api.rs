//! HTTP API endpoints for LandingWise.
//!
//! # Endpoints
//!
//! Owner-scoped (require `x-user-id`):
//!
//! - `POST /api/projects` - Create a project
//! - `GET /api/projects` - List the caller's projects
//! - `GET|PATCH|DELETE /api/projects/:id` - Read, update or delete a project
//! - `POST /api/projects/:id/generate` - Generate or refine the page
//! - `POST /api/projects/:id/style` - Restyle the page
//! - `POST /api/projects/:id/publish` - Publish the page
//! - `GET /api/projects/:id/conversation` - Latest conversation
//! - `GET /api/projects/:id/waitlist` - Waitlist signups
//! - `GET /api/projects/:id/waitlist/export` - Export signups as JSON or CSV
//!
//! Public:
//!
//! - `GET /api/health` - Liveness
//! - `GET /api/pages/:slug` - Published page data
//! - `GET /p/:slug` - Published page HTML with the waitlist script
//! - `POST /api/waitlist` - Join a published page's waitlist
//! - `GET /api/events` - WebSocket stream of workflow events
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use landingwise_server::{create_router, AppState, ProjectStore};
//! use landingwise_workflow::{Config, OpenRouterClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let client = OpenRouterClient::from_env(&config.generation)?;
//! let store = ProjectStore::open(&config.server.state_file).await?;
//!
//! let router = create_router(AppState::new(config, store, Arc::new(client)));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use landingwise_publish::{inject_waitlist_script, ExportEntry, ExportFormat, WaitlistExport};
use landingwise_workflow::{
    ChatMessage, Config, EventBroadcaster, GenerationClient, GenerationContext,
    GenerationRequest, GenerationResult, LandingPageGenerator, RunOptions, Style,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::store::{
    Conversation, NewProject, Project, ProjectMetadata, ProjectStatus, ProjectStore,
    ProjectUpdate, WaitlistEntry,
};
use crate::websocket::ws_handler;

/// Assistant reply saved to the conversation when a run fails.
pub const GENERATION_FAILED_REPLY: &str =
    "Sorry, I couldn't produce a valid landing page for that request. Please try rephrasing it.";

const MAX_TITLE_LEN: usize = 255;
const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_PROJECT_PAGE: usize = 20;
const DEFAULT_WAITLIST_PAGE: usize = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Request body for creating a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Display title (1 to 255 characters).
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// What the page should be about.
    pub prompt: String,
    /// Design style; the configured default when absent.
    pub style: Option<Style>,
}

/// Request body for a partial project update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement HTML.
    pub html_content: Option<String>,
    /// New status.
    pub status: Option<ProjectStatus>,
}

/// Pagination query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    /// Page size (1 to 100).
    pub limit: Option<usize>,
    /// Number of items to skip.
    pub offset: Option<usize>,
}

impl PageQuery {
    fn resolve(self, default_limit: usize) -> Result<(usize, usize), ApiError> {
        let limit = self.limit.unwrap_or(default_limit);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::bad_request(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok((limit, self.offset.unwrap_or(0)))
    }
}

/// A project with its most recent conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    /// The project.
    #[serde(flatten)]
    pub project: Project,
    /// Latest saved conversation, if any.
    pub latest_conversation: Option<Conversation>,
}

/// Generic success acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Always `true`.
    pub success: bool,
}

/// Request body for the generate endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// What to generate or change.
    pub prompt: String,
    /// Earlier messages of the chat.
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
}

/// Response body for the generate and style endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// The project after the run.
    pub project: Project,
    /// The run's outcome.
    pub generation_result: GenerationResult,
}

/// Request body for the style endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRequest {
    /// Free-text description of the desired changes.
    pub style_request: String,
    /// Style to move towards; the project's current style when absent.
    pub target_style: Option<Style>,
}

/// Query parameters for the export endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    /// `json` (default) or `csv`.
    pub format: Option<String>,
}

/// Public view of a published project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPage {
    /// Project id.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Page HTML.
    pub html_content: Option<String>,
    /// Design settings.
    pub metadata: ProjectMetadata,
}

/// Request body for joining a waitlist.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinWaitlistRequest {
    /// Project to join.
    pub project_id: String,
    /// Visitor's address.
    pub email: String,
    /// Extra form data.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Response body for joining a waitlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinWaitlistResponse {
    /// Always `true`.
    pub success: bool,
    /// New entry id.
    pub id: Uuid,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Project storage.
    pub store: Arc<ProjectStore>,
    /// Generation workflow, publishing to `broadcaster`.
    pub generator: LandingPageGenerator,
    /// Workflow events for WebSocket subscribers.
    pub broadcaster: EventBroadcaster,
    /// Cancelled on shutdown; every run uses a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates the state, wiring the generator to a fresh broadcaster.
    #[must_use]
    pub fn new(config: Config, store: ProjectStore, client: Arc<dyn GenerationClient>) -> Self {
        let broadcaster = EventBroadcaster::default();
        let generator = LandingPageGenerator::new(client, config.workflow.clone())
            .with_events(broadcaster.clone());
        Self {
            config,
            store: Arc::new(store),
            generator,
            broadcaster,
            shutdown: CancellationToken::new(),
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all endpoints, CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handle_health))
        .route(
            "/projects",
            post(handle_create_project).get(handle_list_projects),
        )
        .route(
            "/projects/:id",
            get(handle_get_project)
                .patch(handle_update_project)
                .delete(handle_delete_project),
        )
        .route("/projects/:id/generate", post(handle_generate))
        .route("/projects/:id/style", post(handle_adjust_style))
        .route("/projects/:id/publish", post(handle_publish))
        .route("/projects/:id/conversation", get(handle_conversation))
        .route("/projects/:id/waitlist", get(handle_list_waitlist))
        .route("/projects/:id/waitlist/export", get(handle_export_waitlist))
        .route("/pages/:slug", get(handle_public_page))
        .route("/waitlist", post(handle_join_waitlist))
        .route("/events", get(ws_handler));

    Router::new()
        .nest("/api", api_routes)
        .route("/p/:slug", get(handle_published_html))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid project id"))
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title must be between 1 and {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    let Ok(re) = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$") else {
        return false;
    };
    re.is_match(email)
}

async fn owned_project(state: &AppState, user: &AuthUser, raw_id: &str) -> Result<Project, ApiError> {
    let id = parse_id(raw_id)?;
    state
        .store
        .get_project(user.id(), id)
        .await
        .ok_or_else(ApiError::project_not_found)
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for `POST /api/projects`.
async fn handle_create_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    validate_title(&request.title)?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt must not be empty"));
    }

    let project = state
        .store
        .create_project(
            user.id(),
            NewProject {
                title: request.title,
                description: request.description,
                prompt: request.prompt,
                style: request.style.unwrap_or(state.config.server.default_style),
            },
        )
        .await?;

    info!(project_id = %project.id, slug = %project.slug, "Project created");
    Ok(Json(project))
}

/// Handler for `GET /api/projects`.
async fn handle_list_projects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let (limit, offset) = query.resolve(DEFAULT_PROJECT_PAGE)?;
    Ok(Json(state.store.list_projects(user.id(), limit, offset).await))
}

/// Handler for `GET /api/projects/:id`.
async fn handle_get_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    let latest_conversation = state.store.latest_conversation(project.id).await;
    Ok(Json(ProjectDetail {
        project,
        latest_conversation,
    }))
}

/// Handler for `PATCH /api/projects/:id`.
async fn handle_update_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    let id = parse_id(&id)?;
    if let Some(title) = &request.title {
        validate_title(title)?;
    }

    let update = ProjectUpdate {
        title: request.title,
        description: request.description,
        html_content: request.html_content,
        status: request.status,
        style: None,
    };
    state
        .store
        .update_project(user.id(), id, update)
        .await?
        .map(Json)
        .ok_or_else(ApiError::project_not_found)
}

/// Handler for `DELETE /api/projects/:id`.
async fn handle_delete_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete_project(user.id(), id).await? {
        return Err(ApiError::project_not_found());
    }
    info!(project_id = %id, "Project deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// Handler for `POST /api/projects/:id/generate`.
///
/// Runs the workflow with the project's current HTML and style. The HTML is
/// only stored when the run succeeds; the conversation is saved either way.
async fn handle_generate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt must not be empty"));
    }

    let history = request.conversation_history.unwrap_or_default();
    let mut context = GenerationContext::new(request.prompt.clone())
        .with_style(project.metadata.style)
        .with_history(history.clone());
    if let Some(html) = project.html_content.as_deref().filter(|h| !h.is_empty()) {
        context = context.with_current_content(html);
    }

    info!(project_id = %project.id, refining = context.current_content.is_some(), "Generation requested");
    let options = RunOptions::new(project.id.to_string()).with_cancel(state.shutdown.child_token());
    let result = state
        .generator
        .run(GenerationRequest::Compose(context), options)
        .await;

    let project = if result.success {
        let update = ProjectUpdate {
            html_content: Some(result.html.clone()),
            ..ProjectUpdate::default()
        };
        state
            .store
            .update_project(user.id(), project.id, update)
            .await?
            .ok_or_else(ApiError::project_not_found)?
    } else {
        warn!(
            project_id = %project.id,
            errors = ?result.errors,
            "Generation failed, keeping previous content"
        );
        project
    };

    let reply = if result.success {
        result.html.clone()
    } else {
        GENERATION_FAILED_REPLY.to_string()
    };
    let mut messages = history;
    messages.push(ChatMessage::user(request.prompt));
    messages.push(ChatMessage::assistant(reply));
    state.store.append_conversation(project.id, messages).await?;

    Ok(Json(GenerateResponse {
        project,
        generation_result: result,
    }))
}

/// Handler for `POST /api/projects/:id/style`.
async fn handle_adjust_style(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<StyleRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    let Some(current_html) = project.html_content.clone().filter(|h| !h.is_empty()) else {
        return Err(ApiError::bad_request(
            "Cannot adjust style of a project without generated content",
        ));
    };
    let target_style = request.target_style.unwrap_or(project.metadata.style);

    info!(project_id = %project.id, target_style = %target_style, "Style adjustment requested");
    let options = RunOptions::new(project.id.to_string()).with_cancel(state.shutdown.child_token());
    let mut result = state
        .generator
        .run(
            GenerationRequest::StyleAdjustment {
                current_html: current_html.clone(),
                style_request: request.style_request,
                target_style,
            },
            options,
        )
        .await;

    let project = if result.success {
        let update = ProjectUpdate {
            html_content: Some(result.html.clone()),
            style: Some(target_style),
            ..ProjectUpdate::default()
        };
        state
            .store
            .update_project(user.id(), project.id, update)
            .await?
            .ok_or_else(ApiError::project_not_found)?
    } else {
        result.html = current_html;
        project
    };

    Ok(Json(GenerateResponse {
        project,
        generation_result: result,
    }))
}

/// Handler for `POST /api/projects/:id/publish`.
async fn handle_publish(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    if !project.has_content() {
        return Err(ApiError::bad_request(
            "Cannot publish project without generated content",
        ));
    }

    let update = ProjectUpdate {
        status: Some(ProjectStatus::Published),
        ..ProjectUpdate::default()
    };
    let published = state
        .store
        .update_project(user.id(), project.id, update)
        .await?
        .ok_or_else(ApiError::project_not_found)?;

    info!(project_id = %published.id, slug = %published.slug, "Project published");
    Ok(Json(published))
}

/// Handler for `GET /api/projects/:id/conversation`.
async fn handle_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    let messages = state
        .store
        .latest_conversation(project.id)
        .await
        .map(|c| c.messages)
        .unwrap_or_default();
    Ok(Json(messages))
}

/// Handler for `GET /api/projects/:id/waitlist`.
async fn handle_list_waitlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<WaitlistEntry>>, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    let (limit, offset) = query.resolve(DEFAULT_WAITLIST_PAGE)?;
    Ok(Json(
        state
            .store
            .waitlist_entries(project.id, Some(limit), offset)
            .await,
    ))
}

/// Handler for `GET /api/projects/:id/waitlist/export`.
async fn handle_export_waitlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let project = owned_project(&state, &user, &id).await?;
    let format = match query.format.as_deref() {
        None => ExportFormat::Json,
        Some(raw) => raw
            .parse::<ExportFormat>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
    };

    let entries = state
        .store
        .waitlist_entries(project.id, None, 0)
        .await
        .into_iter()
        .map(|w| ExportEntry {
            email: w.email,
            created_at: w.created_at,
            metadata: w.metadata,
        })
        .collect();
    let body = WaitlistExport::new(entries)
        .render(format)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let disposition = format!(
        "attachment; filename=\"waitlist-{}.{}\"",
        project.slug,
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Handler for `GET /api/pages/:slug`.
async fn handle_public_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPage>, ApiError> {
    let project = state
        .store
        .published_by_slug(&slug)
        .await
        .ok_or_else(|| ApiError::NotFound("Landing page not found".to_string()))?;

    Ok(Json(PublicPage {
        id: project.id,
        title: project.title,
        description: project.description,
        html_content: project.html_content,
        metadata: project.metadata,
    }))
}

/// Handler for `GET /p/:slug`.
async fn handle_published_html(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Html<String>, ApiError> {
    let project = state
        .store
        .published_by_slug(&slug)
        .await
        .filter(Project::has_content)
        .ok_or_else(|| ApiError::NotFound("Landing page not found".to_string()))?;

    let html = project.html_content.unwrap_or_default();
    Ok(Html(inject_waitlist_script(&html, &project.id.to_string())))
}

/// Handler for `POST /api/waitlist`.
async fn handle_join_waitlist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JoinWaitlistRequest>,
) -> Result<Json<JoinWaitlistResponse>, ApiError> {
    let project_id = Uuid::parse_str(&request.project_id)
        .map_err(|_| ApiError::bad_request("Invalid request data: projectId"))?;
    let email = request.email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid request data: email"));
    }

    let project = state
        .store
        .published_by_id(project_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Landing page not found or not published".to_string()))?;

    let entry = state
        .store
        .add_waitlist_entry(project.id, email, request.metadata)
        .await?;

    info!(project_id = %project.id, entry_id = %entry.id, "Waitlist signup recorded");
    Ok(Json(JoinWaitlistResponse {
        success: true,
        id: entry.id,
    }))
}

// ============================================================================
// Tests
// ============================================================================

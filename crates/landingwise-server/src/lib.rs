//! LandingWise Server
//!
//! HTTP API for projects, generation, publishing and waitlists, plus the
//! WebSocket stream of workflow events.

pub mod api;
pub mod auth;
pub mod error;
pub mod store;
pub mod websocket;

pub use api::{
    create_router, AppState, CreateProjectRequest, GenerateRequest, GenerateResponse,
    HealthResponse, JoinWaitlistRequest, JoinWaitlistResponse, PageQuery, ProjectDetail,
    PublicPage, StyleRequest, SuccessResponse, UpdateProjectRequest, GENERATION_FAILED_REPLY,
};
pub use auth::{AuthUser, USER_ID_HEADER};
pub use error::{ApiError, ErrorResponse, StoreError};
pub use store::{
    Conversation, NewProject, Project, ProjectMetadata, ProjectStatus, ProjectStore,
    ProjectUpdate, WaitlistEntry,
};
pub use websocket::{ws_handler, HEARTBEAT_INTERVAL};

//! LandingWise generation workflow
//!
//! Generates landing pages with a text-generation model, checks them for the
//! required structure, and asks the model to correct them until they pass or
//! the iteration cap is reached.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod prompt;
pub mod state;
pub mod validator;
pub mod workflow;

#[cfg(any(test, feature = "testing"))]
pub use client::ScriptedClient;
pub use client::{GenerationClient, OpenRouterClient, PromptMessage, PromptRole};
pub use config::{Config, GenerationConfig, ServerConfig, TransportFallback, WorkflowConfig};
pub use error::{LandingError, LlmErrorKind, Result};
pub use events::{EventBroadcaster, WorkflowEvent};
pub use state::{
    ChatMessage, GenerationContext, GenerationResult, Role, Style, WorkflowState, WorkflowStep,
    DEFAULT_MAX_ITERATIONS,
};
pub use validator::{validate_html, ValidationVerdict};
pub use workflow::{
    GenerationRequest, LandingPageGenerator, RunOptions, FALLBACK_HTML, MAX_ITERATIONS_ERROR,
};

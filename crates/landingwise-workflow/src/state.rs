//! Workflow state types for landing page generation.
//!
//! This module defines the immutable input of a run ([`GenerationContext`]),
//! the state owned by one run while it executes ([`WorkflowState`]), and the
//! terminal value handed back to the caller ([`GenerationResult`]).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LandingError, Result};

/// Default cap on generate/correct calls per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

// ============================================================================
// Style
// ============================================================================

/// Visual style preset applied to a generated page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Style {
    /// Clean lines, bold typography (default).
    #[default]
    Modern,
    /// Maximum whitespace, simple elements.
    Minimal,
    /// Professional, business-oriented.
    Corporate,
    /// Unique layouts, artistic elements.
    Creative,
}

impl Style {
    /// All presets in declaration order.
    pub const ALL: [Self; 4] = [Self::Modern, Self::Minimal, Self::Corporate, Self::Creative];

    /// Returns the lowercase preset name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Minimal => "minimal",
            Self::Corporate => "corporate",
            Self::Creative => "creative",
        }
    }

    /// Parses a string into a `Style`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "modern" => Some(Self::Modern),
            "minimal" => Some(Self::Minimal),
            "corporate" => Some(Self::Corporate),
            "creative" => Some(Self::Creative),
            _ => None,
        }
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            format!(
                "invalid style '{s}': expected one of 'modern', 'minimal', 'corporate', 'creative'"
            )
        })
    }
}

impl<'de> Deserialize<'de> for Style {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Style {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person describing the page.
    User,
    /// The generator.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of a project's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text (for assistant messages, usually the generated HTML).
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// GenerationContext
// ============================================================================

/// Immutable input to one workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    /// What the user asked for.
    pub user_prompt: String,

    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub previous_messages: Vec<ChatMessage>,

    /// The page being refined, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_content: Option<String>,

    /// Style preset.
    #[serde(default)]
    pub style: Style,
}

impl GenerationContext {
    /// Creates a context for a fresh page with the default style.
    #[must_use]
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the style preset.
    #[must_use]
    pub const fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Sets the page being refined.
    #[must_use]
    pub fn with_current_content(mut self, html: impl Into<String>) -> Self {
        self.current_content = Some(html.into());
        self
    }

    /// Sets the conversation history.
    #[must_use]
    pub fn with_history(mut self, messages: Vec<ChatMessage>) -> Self {
        self.previous_messages = messages;
        self
    }
}

// ============================================================================
// WorkflowStep
// ============================================================================

/// Step of the generation state machine.
///
/// - `Generate` -> `Validate`
/// - `Validate` -> `Validate` (after a corrective call) or `Done`
/// - `Generate` -> `Done` only when the run is cancelled before validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Initial prompt is sent to the generation client.
    #[default]
    Generate,
    /// Generated HTML is checked and corrected if needed.
    Validate,
    /// Terminal.
    Done,
}

impl WorkflowStep {
    /// Returns `true` if `self -> next` is an allowed transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Generate, Self::Validate | Self::Done)
                | (Self::Validate, Self::Validate | Self::Done)
        )
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Validate => write!(f, "validate"),
            Self::Done => write!(f, "done"),
        }
    }
}

// ============================================================================
// WorkflowState
// ============================================================================

/// State owned by exactly one workflow run.
///
/// `errors` only grows and `iterations` never exceeds `max_iterations`; both
/// are private so that the only way to change them is through the methods
/// below.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    /// What the user asked for.
    pub user_prompt: String,
    /// The run's input context.
    pub context: GenerationContext,
    /// Latest HTML returned by the generation client.
    pub generated_html: String,
    /// Whether `generated_html` passed validation.
    pub is_valid: bool,
    step: WorkflowStep,
    iterations: u32,
    max_iterations: u32,
    errors: Vec<String>,
}

impl WorkflowState {
    /// Creates a state positioned at `Generate` with no iterations recorded.
    #[must_use]
    pub fn new(
        user_prompt: impl Into<String>,
        context: GenerationContext,
        max_iterations: u32,
    ) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            context,
            generated_html: String::new(),
            is_valid: false,
            step: WorkflowStep::Generate,
            iterations: 0,
            max_iterations: max_iterations.max(1),
            errors: Vec::new(),
        }
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> WorkflowStep {
        self.step
    }

    /// Number of generation calls made so far.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Iteration cap for this run.
    #[must_use]
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Errors recorded so far, oldest first.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns `true` while another generation call fits under the cap.
    #[must_use]
    pub const fn has_iterations_left(&self) -> bool {
        self.iterations < self.max_iterations
    }

    /// Returns `true` once the run reached `Done`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.step == WorkflowStep::Done
    }

    /// Appends an error message.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Counts one generation call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the cap is already reached.
    pub fn record_iteration(&mut self) -> Result<u32> {
        if !self.has_iterations_left() {
            return Err(LandingError::invalid_transition(
                format!("iteration {}", self.iterations),
                format!("iteration {} (max {})", self.iterations + 1, self.max_iterations),
            ));
        }
        self.iterations += 1;
        Ok(self.iterations)
    }

    /// Moves to the next step.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the transition is not allowed.
    pub fn transition(&mut self, next: WorkflowStep) -> Result<()> {
        if !self.step.can_transition_to(next) {
            return Err(LandingError::invalid_transition(self.step, next));
        }
        self.step = next;
        Ok(())
    }

    /// Builds the caller-facing result from this state.
    #[must_use]
    pub fn into_result(self) -> GenerationResult {
        GenerationResult {
            html: self.generated_html,
            success: self.is_valid,
            errors: self.errors,
            iterations: self.iterations,
        }
    }
}

// ============================================================================
// GenerationResult
// ============================================================================

/// Terminal value of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Final HTML.
    pub html: String,
    /// Whether the HTML passed validation.
    pub success: bool,
    /// Every error recorded during the run, oldest first.
    pub errors: Vec<String>,
    /// Number of generation calls made.
    pub iterations: u32,
}

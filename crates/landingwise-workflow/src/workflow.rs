//! The generate/validate state machine.
//!
//! A run starts at [`WorkflowStep::Generate`], makes one generation call and
//! moves to [`WorkflowStep::Validate`]. Validation either ends the run or
//! issues a corrective call and validates again, until the HTML passes or the
//! iteration cap is reached.
//!
//! ```text
//!  Generate ──► Validate ──► Done
//!                 │  ▲
//!                 └──┘  (corrective call)
//! ```
//!
//! Client failures never escape a run. They are appended to the run's error
//! list, and the run always ends with a [`GenerationResult`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{GenerationClient, PromptMessage};
use crate::config::{TransportFallback, WorkflowConfig};
use crate::error::{LandingError, Result};
use crate::events::{EventBroadcaster, WorkflowEvent};
use crate::prompt::{corrective_prompt, landing_page_prompt, style_adjustment_prompt};
use crate::state::{
    ChatMessage, GenerationContext, GenerationResult, Style, WorkflowState, WorkflowStep,
};
use crate::validator::validate_html;

/// Error appended when the cap is reached with HTML that still fails
/// validation.
pub const MAX_ITERATIONS_ERROR: &str = "Validation failed after maximum iterations";

/// Ceiling on how far a run deadline may sit in the future.
const MAX_RUN_WAIT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Known-good page substituted under [`TransportFallback::FallbackDocument`].
pub const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Your Landing Page</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-50">
    <div class="min-h-screen flex items-center justify-center px-4">
        <div class="max-w-md w-full bg-white rounded-lg shadow-md p-8">
            <h1 class="text-2xl font-bold text-gray-900 mb-4">Coming Soon</h1>
            <p class="text-gray-600 mb-6">We're building something amazing. Join our waitlist to be the first to know when we launch!</p>
            <form data-waitlist="true" class="space-y-4">
                <div>
                    <label for="email" class="block text-sm font-medium text-gray-700">Email</label>
                    <input type="email" id="email" name="email" required
                        class="mt-1 block w-full px-3 py-2 border border-gray-300 rounded-md shadow-sm focus:outline-none focus:ring-blue-500 focus:border-blue-500"
                        placeholder="Enter your email">
                </div>
                <button type="submit"
                    class="w-full bg-blue-600 text-white py-2 px-4 rounded-md hover:bg-blue-700 focus:outline-none focus:ring-2 focus:ring-blue-500 focus:ring-offset-2">
                    Join Waitlist
                </button>
            </form>
        </div>
    </div>
</body>
</html>"#;

// ============================================================================
// Requests and options
// ============================================================================

/// What a run is asked to produce.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// Compose a page, or refine one when the context carries current content.
    Compose(GenerationContext),
    /// Restyle an existing page.
    StyleAdjustment {
        /// The page being restyled.
        current_html: String,
        /// Free-text description of the desired changes.
        style_request: String,
        /// Style to move towards.
        target_style: Style,
    },
}

impl GenerationRequest {
    /// Messages for the initial generation call.
    fn initial_messages(&self) -> Vec<PromptMessage> {
        match self {
            Self::Compose(context) => vec![
                PromptMessage::system(landing_page_prompt(context)),
                PromptMessage::user(context.user_prompt.clone()),
            ],
            Self::StyleAdjustment {
                current_html,
                style_request,
                target_style,
            } => vec![PromptMessage::system(style_adjustment_prompt(
                current_html,
                style_request,
                *target_style,
            ))],
        }
    }

    fn into_state(self, max_iterations: u32) -> WorkflowState {
        match self {
            Self::Compose(context) => {
                WorkflowState::new(context.user_prompt.clone(), context, max_iterations)
            }
            Self::StyleAdjustment {
                current_html,
                style_request,
                target_style,
            } => {
                let context = GenerationContext::new(style_request.clone())
                    .with_style(target_style)
                    .with_current_content(current_html);
                WorkflowState::new(style_request, context, max_iterations)
            }
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Identifier carried by logs and events.
    pub run_id: String,
    /// Cancelling this token ends the run before its next external call
    /// completes.
    pub cancel: CancellationToken,
    /// Overrides `WorkflowConfig::run_timeout_secs` when set.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    /// Creates options with a fresh cancellation token.
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Uses `cancel` instead of a fresh token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets a run deadline that overrides the configured one.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new("run")
    }
}

// ============================================================================
// LandingPageGenerator
// ============================================================================

/// Drives generation runs against a [`GenerationClient`].
#[derive(Clone)]
pub struct LandingPageGenerator {
    client: Arc<dyn GenerationClient>,
    config: WorkflowConfig,
    events: Option<EventBroadcaster>,
}

impl std::fmt::Debug for LandingPageGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandingPageGenerator")
            .field("config", &self.config)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

/// Deadline bookkeeping for a single run.
struct RunGuard<'a> {
    options: &'a RunOptions,
    deadline: Instant,
    timeout: Duration,
}

impl RunGuard<'_> {
    fn check(&self) -> Result<()> {
        if self.options.cancel.is_cancelled() {
            return Err(LandingError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(self.expired());
        }
        Ok(())
    }

    const fn expired(&self) -> LandingError {
        LandingError::DeadlineExceeded {
            timeout: self.timeout,
        }
    }
}

impl LandingPageGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(client: Arc<dyn GenerationClient>, config: WorkflowConfig) -> Self {
        Self {
            client,
            config,
            events: None,
        }
    }

    /// Publishes progress events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBroadcaster) -> Self {
        self.events = Some(events);
        self
    }

    /// The workflow settings in use.
    #[must_use]
    pub const fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Generates a page from `user_prompt` and `context`.
    ///
    /// The prompt in `context` is replaced by `user_prompt`.
    pub async fn generate_landing_page(
        &self,
        user_prompt: &str,
        context: GenerationContext,
    ) -> GenerationResult {
        let context = GenerationContext {
            user_prompt: user_prompt.to_string(),
            ..context
        };
        self.run(GenerationRequest::Compose(context), RunOptions::default())
            .await
    }

    /// Refines `current_html` according to `feedback`.
    ///
    /// If the run fails, `html` in the result is `current_html` unchanged.
    pub async fn refine_content(
        &self,
        current_html: &str,
        feedback: &str,
        history: Vec<ChatMessage>,
    ) -> GenerationResult {
        let context = GenerationContext::new(feedback)
            .with_current_content(current_html)
            .with_history(history);
        let result = self
            .run(GenerationRequest::Compose(context), RunOptions::default())
            .await;
        keep_current_on_failure(result, current_html)
    }

    /// Restyles `current_html` towards `target_style`.
    ///
    /// If the run fails, `html` in the result is `current_html` unchanged.
    pub async fn adjust_style(
        &self,
        current_html: &str,
        style_request: &str,
        target_style: Style,
    ) -> GenerationResult {
        let request = GenerationRequest::StyleAdjustment {
            current_html: current_html.to_string(),
            style_request: style_request.to_string(),
            target_style,
        };
        let result = self.run(request, RunOptions::default()).await;
        keep_current_on_failure(result, current_html)
    }

    /// Runs the state machine to completion.
    pub async fn run(&self, request: GenerationRequest, options: RunOptions) -> GenerationResult {
        let timeout = options
            .timeout
            .unwrap_or_else(|| Duration::from_secs(self.config.run_timeout_secs));
        let guard = RunGuard {
            options: &options,
            deadline: Instant::now() + timeout.min(MAX_RUN_WAIT),
            timeout,
        };

        let initial = request.initial_messages();
        let mut state = request.into_state(self.config.max_iterations);

        info!(
            run_id = %options.run_id,
            max_iterations = state.max_iterations(),
            "Workflow run started"
        );
        self.emit(WorkflowEvent::run_started(
            &options.run_id,
            state.max_iterations(),
        ));

        while !state.is_terminal() {
            let outcome = match state.step() {
                WorkflowStep::Generate => self.generate(&initial, &mut state, &guard).await,
                WorkflowStep::Validate => self.validate(&mut state, &guard).await,
                WorkflowStep::Done => break,
            };

            let next = match outcome {
                Ok(next) => next,
                Err(stop) => {
                    warn!(run_id = %options.run_id, reason = %stop.summary(), "Workflow run stopped");
                    state.is_valid = false;
                    state.push_error(stop.summary());
                    WorkflowStep::Done
                }
            };

            if let Err(e) = state.transition(next) {
                warn!(run_id = %options.run_id, error = %e, "Workflow transition rejected");
                state.push_error(e.summary());
                break;
            }
        }

        info!(
            run_id = %options.run_id,
            success = state.is_valid,
            iterations = state.iterations(),
            errors = state.errors().len(),
            "Workflow run complete"
        );
        self.emit(WorkflowEvent::run_complete(
            &options.run_id,
            state.is_valid,
            state.iterations(),
            state.errors().to_vec(),
        ));

        state.into_result()
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    async fn generate(
        &self,
        messages: &[PromptMessage],
        state: &mut WorkflowState,
        guard: &RunGuard<'_>,
    ) -> Result<WorkflowStep> {
        guard.check()?;
        let iteration = state.record_iteration()?;
        debug!(run_id = %guard.options.run_id, iteration, step = "generate", "Calling generation client");
        self.emit(WorkflowEvent::iteration_start(
            &guard.options.run_id,
            iteration,
            WorkflowStep::Generate,
        ));

        match self.call(messages, guard).await {
            Ok(html) => state.generated_html = html,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => self.record_client_failure(state, "Generation error", &e, guard),
        }
        Ok(WorkflowStep::Validate)
    }

    async fn validate(
        &self,
        state: &mut WorkflowState,
        guard: &RunGuard<'_>,
    ) -> Result<WorkflowStep> {
        let verdict = validate_html(&state.generated_html);
        debug!(
            run_id = %guard.options.run_id,
            iteration = state.iterations(),
            valid = verdict.is_basic_valid(),
            "Validated generated HTML"
        );
        self.emit(WorkflowEvent::validation(
            &guard.options.run_id,
            state.iterations(),
            verdict,
        ));

        if verdict.is_basic_valid() {
            state.is_valid = true;
            return Ok(WorkflowStep::Done);
        }
        state.is_valid = false;

        if !state.has_iterations_left() {
            warn!(
                run_id = %guard.options.run_id,
                iterations = state.iterations(),
                "Iteration cap reached with invalid HTML"
            );
            state.push_error(MAX_ITERATIONS_ERROR);
            return Ok(WorkflowStep::Done);
        }

        guard.check()?;
        let iteration = state.record_iteration()?;
        debug!(run_id = %guard.options.run_id, iteration, step = "validate", "Requesting corrected HTML");
        self.emit(WorkflowEvent::iteration_start(
            &guard.options.run_id,
            iteration,
            WorkflowStep::Validate,
        ));

        let prompt = corrective_prompt(&state.generated_html, &verdict);
        match self.call(&[PromptMessage::system(prompt)], guard).await {
            Ok(html) => state.generated_html = html,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => self.record_client_failure(state, "Validation error", &e, guard),
        }
        Ok(WorkflowStep::Validate)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Invokes the client, racing cancellation and the run deadline.
    async fn call(&self, messages: &[PromptMessage], guard: &RunGuard<'_>) -> Result<String> {
        tokio::select! {
            biased;
            () = guard.options.cancel.cancelled() => Err(LandingError::Cancelled),
            () = tokio::time::sleep_until(guard.deadline) => Err(guard.expired()),
            reply = self.client.invoke(messages) => reply,
        }
    }

    fn record_client_failure(
        &self,
        state: &mut WorkflowState,
        label: &str,
        error: &LandingError,
        guard: &RunGuard<'_>,
    ) {
        warn!(
            run_id = %guard.options.run_id,
            iteration = state.iterations(),
            error = %error.summary(),
            "{label}"
        );
        state.push_error(format!("{label}: {}", error.summary()));
        if self.config.transport_fallback == TransportFallback::FallbackDocument {
            state.generated_html = FALLBACK_HTML.to_string();
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }
}

fn keep_current_on_failure(mut result: GenerationResult, current_html: &str) -> GenerationResult {
    if !result.success {
        result.html = current_html.to_string();
    }
    result
}

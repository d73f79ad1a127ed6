//! Progress events for observing workflow runs.
//!
//! Events are broadcast to every subscriber as a run moves through its
//! steps. They are not persisted; a subscriber that connects late only sees
//! what happens afterwards.
//!
//! # Event Types
//!
//! - `run_started` - A run begins
//! - `iteration_start` - A generation call is about to be made
//! - `validation` - Generated HTML was checked
//! - `run_complete` - A run reached its terminal state
//!
//! # Example
//!
//! ```no_run
//! use landingwise_workflow::events::{EventBroadcaster, WorkflowEvent};
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! broadcaster.send(WorkflowEvent::run_started("project-1", 3));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {}", event.event_name());
//! }
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::state::WorkflowStep;
use crate::validator::ValidationVerdict;

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `run_started` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartedPayload {
    /// Caller-chosen identifier of the run.
    pub run_id: String,
    /// Iteration cap of the run.
    pub max_iterations: u32,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
}

/// Payload for the `iteration_start` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationStartPayload {
    /// Run identifier.
    pub run_id: String,
    /// The iteration about to run (1-indexed).
    pub iteration: u32,
    /// `generate` for the initial call, `validate` for corrective calls.
    pub step: WorkflowStep,
}

/// Payload for the `validation` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPayload {
    /// Run identifier.
    pub run_id: String,
    /// Iterations made when the check ran.
    pub iteration: u32,
    /// Check outcome.
    pub verdict: ValidationVerdict,
}

/// Payload for the `run_complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCompletePayload {
    /// Run identifier.
    pub run_id: String,
    /// Whether the final HTML passed validation.
    pub success: bool,
    /// Total generation calls.
    pub iterations: u32,
    /// Errors recorded during the run.
    pub errors: Vec<String>,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Workflow progress events.
///
/// Serialized as JSON objects with "event" and "payload" fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A run begins.
    RunStarted(RunStartedPayload),
    /// A generation call is about to be made.
    IterationStart(IterationStartPayload),
    /// Generated HTML was checked.
    Validation(ValidationPayload),
    /// A run finished.
    RunComplete(RunCompletePayload),
}

impl WorkflowEvent {
    /// Creates a `RunStarted` event.
    #[must_use]
    pub fn run_started(run_id: impl Into<String>, max_iterations: u32) -> Self {
        Self::RunStarted(RunStartedPayload {
            run_id: run_id.into(),
            max_iterations,
            timestamp: Utc::now(),
        })
    }

    /// Creates an `IterationStart` event.
    #[must_use]
    pub fn iteration_start(run_id: impl Into<String>, iteration: u32, step: WorkflowStep) -> Self {
        Self::IterationStart(IterationStartPayload {
            run_id: run_id.into(),
            iteration,
            step,
        })
    }

    /// Creates a `Validation` event.
    #[must_use]
    pub fn validation(
        run_id: impl Into<String>,
        iteration: u32,
        verdict: ValidationVerdict,
    ) -> Self {
        Self::Validation(ValidationPayload {
            run_id: run_id.into(),
            iteration,
            verdict,
        })
    }

    /// Creates a `RunComplete` event.
    #[must_use]
    pub fn run_complete(
        run_id: impl Into<String>,
        success: bool,
        iterations: u32,
        errors: Vec<String>,
    ) -> Self {
        Self::RunComplete(RunCompletePayload {
            run_id: run_id.into(),
            success,
            iterations,
            errors,
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::RunStarted(_) => "run_started",
            Self::IterationStart(_) => "iteration_start",
            Self::Validation(_) => "validation",
            Self::RunComplete(_) => "run_complete",
        }
    }

    /// The run this event belongs to.
    #[must_use]
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted(p) => &p.run_id,
            Self::IterationStart(p) => &p.run_id,
            Self::Validation(p) => &p.run_id,
            Self::RunComplete(p) => &p.run_id,
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Broadcasts workflow events to all subscribers.
///
/// Uses a tokio broadcast channel for pub-sub distribution.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBroadcaster {
    /// Creates a new `EventBroadcaster` with the specified buffer capacity.
    ///
    /// A subscriber that falls more than `capacity` events behind receives a
    /// `Lagged` error and misses the oldest events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new subscriber for receiving events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event to all subscribers.
    ///
    /// Returns the number of receivers; 0 means nobody is listening.
    pub fn send(&self, event: WorkflowEvent) -> usize {
        // send() returns Err only if there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

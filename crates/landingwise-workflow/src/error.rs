//! Error types for the LandingWise generation workflow.
//!
//! This module defines the error hierarchy for configuration loading,
//! calls to the text-generation API, and workflow state handling.
//!
//! Transport and malformed-response errors never escape a workflow run:
//! the workflow converts them into entries of the run's error list. They
//! surface as `Err` only from direct [`GenerationClient`](crate::GenerationClient)
//! calls.

use std::path::PathBuf;
use std::time::Duration;

/// A specialized `Result` type for LandingWise workflow operations.
pub type Result<T> = std::result::Result<T, LandingError>;

/// Errors that can occur while configuring or running landing page generation.
#[derive(Debug, thiserror::Error)]
pub enum LandingError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your landingwise.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The API key environment variable is not set.
    #[error("API key not found in environment variable '{env_var}'\n\nSuggestion: Export {env_var} with your OpenRouter API key")]
    MissingApiKey {
        /// Name of the environment variable that was checked.
        env_var: String,
    },

    // ========================================================================
    // Generation Errors
    // ========================================================================
    /// The text-generation endpoint could not be reached or answered with a
    /// non-success status.
    #[error("Generation transport error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    GenerationTransport {
        /// The kind of transport failure.
        kind: LlmErrorKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The endpoint answered successfully but the payload did not have the
    /// expected `choices[0].message.content` shape.
    #[error("Malformed generation response: {message}")]
    MalformedResponse {
        /// Description of what was missing or unparseable.
        message: String,
    },

    /// The run was cancelled by its caller.
    #[error("Generation cancelled")]
    Cancelled,

    /// The run exceeded its deadline.
    #[error("Generation deadline exceeded after {timeout:?}")]
    DeadlineExceeded {
        /// The run deadline.
        timeout: Duration,
    },

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid workflow step transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current step.
        from: String,
        /// The attempted target step.
        to: String,
    },
}

/// Categories of generation transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Authentication failure (invalid API key, expired credentials).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// The request did not complete within the per-request timeout.
    Timeout,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl LlmErrorKind {
    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check your OpenRouter API key",
            Self::RateLimit => "Wait and retry, or reduce request frequency",
            Self::Server => "Retry later; the generation service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Timeout => "Retry, or raise generation.requestTimeoutSecs",
            Self::Other => "Check the OpenRouter status page",
        }
    }

    /// Classifies a non-success HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            408 => Self::Timeout,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl LandingError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            env_var: env_var.into(),
        }
    }

    /// Creates a new `GenerationTransport` error with automatic suggestion based on kind.
    #[must_use]
    pub fn transport(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        let suggestion = kind.suggestion().to_string();
        Self::GenerationTransport {
            kind,
            message: message.into(),
            suggestion,
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Short, single-line description used in a run's error list.
    ///
    /// Suggestions are dropped so the entries stay readable in chat history.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::GenerationTransport { kind, message, .. } => format!("{kind}: {message}"),
            Self::MalformedResponse { message } => format!("malformed response: {message}"),
            other => other
                .to_string()
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Returns `true` if this error is transient and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::GenerationTransport {
                kind: LlmErrorKind::RateLimit
                    | LlmErrorKind::Server
                    | LlmErrorKind::Network
                    | LlmErrorKind::Timeout,
                ..
            }
        )
    }

    /// Returns `true` if this error ends a run without further external calls.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::MissingApiKey { .. }
                | Self::Cancelled
                | Self::DeadlineExceeded { .. }
        )
    }
}

//! Configuration types for LandingWise.
//!
//! This module provides the configuration structures used to control the
//! generation endpoint, the workflow's iteration and deadline limits, and
//! the HTTP server.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LandingError, Result};
use crate::state::{Style, DEFAULT_MAX_ITERATIONS};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "landingwise.json";

/// Upper bound accepted for `workflow.maxIterations`.
pub const MAX_ITERATIONS_LIMIT: u32 = 10;

/// Upper bound accepted for `workflow.runTimeoutSecs` (one day).
pub const MAX_RUN_TIMEOUT_SECS: u64 = 24 * 60 * 60;

fn default_model() -> String {
    "meta-llama/llama-3.1-8b-instruct:free".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    4000
}

const fn default_request_timeout() -> u64 {
    60
}

fn default_referer() -> String {
    "http://localhost:3000".to_string()
}

fn default_app_title() -> String {
    "LandingWise".to_string()
}

const fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// Default deadline for a whole workflow run in seconds.
const fn default_run_timeout() -> u64 {
    180
}

const fn default_port() -> u16 {
    3000
}

fn default_state_file() -> String {
    ".landingwise/store.json".to_string()
}

/// Main configuration for LandingWise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Text-generation endpoint settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Generation workflow settings.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `landingwise.json` in the current directory. If not found,
    /// returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            LandingError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `landingwise.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `LandingError::ConfigParseError` if the file exists but contains
    /// invalid JSON or invalid enum values.
    ///
    /// Returns `LandingError::ConfigValidationError` if the configuration values
    /// are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(LandingError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| LandingError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `LandingError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;

        if generation.model.trim().is_empty() {
            return Err(LandingError::config_validation(
                "generation.model must not be empty",
                "Set generation.model to an OpenRouter model id in your landingwise.json",
            ));
        }

        if !(generation.base_url.starts_with("http://")
            || generation.base_url.starts_with("https://"))
        {
            return Err(LandingError::config_validation(
                format!("generation.baseUrl '{}' is not an http(s) URL", generation.base_url),
                "Use a URL such as https://openrouter.ai/api/v1",
            ));
        }

        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(LandingError::config_validation(
                "generation.temperature must be between 0.0 and 2.0",
                "Set generation.temperature to a value like 0.7",
            ));
        }

        if generation.max_tokens == 0 {
            return Err(LandingError::config_validation(
                "generation.maxTokens must be greater than 0",
                "Set generation.maxTokens to at least 1 (4000 is typical)",
            ));
        }

        if generation.request_timeout_secs == 0 {
            return Err(LandingError::config_validation(
                "generation.requestTimeoutSecs must be greater than 0",
                "Set generation.requestTimeoutSecs to at least 1 second",
            ));
        }

        if self.workflow.max_iterations == 0 || self.workflow.max_iterations > MAX_ITERATIONS_LIMIT
        {
            return Err(LandingError::config_validation(
                format!("workflow.maxIterations must be between 1 and {MAX_ITERATIONS_LIMIT}"),
                "Set workflow.maxIterations to 3 unless you have a reason not to",
            ));
        }

        if self.workflow.run_timeout_secs == 0
            || self.workflow.run_timeout_secs > MAX_RUN_TIMEOUT_SECS
        {
            return Err(LandingError::config_validation(
                format!("workflow.runTimeoutSecs must be between 1 and {MAX_RUN_TIMEOUT_SECS}"),
                "Set workflow.runTimeoutSecs to 180 unless generations are unusually slow",
            ));
        }

        if self.server.state_file.trim().is_empty() {
            return Err(LandingError::config_validation(
                "server.stateFile must not be empty",
                "Provide a path such as .landingwise/store.json",
            ));
        }

        Ok(())
    }
}

/// Settings for the chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token limit.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Sent as `HTTP-Referer`.
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Sent as `X-Title`.
    #[serde(default = "default_app_title")]
    pub app_title: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            referer: default_referer(),
            app_title: default_app_title(),
        }
    }
}

/// What the workflow does when the generation client fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFallback {
    /// Record the error and continue to validation with whatever HTML is
    /// current, letting the corrective pass retry.
    #[default]
    Retry,
    /// Record the error and substitute the built-in fallback document.
    FallbackDocument,
}

/// Settings for a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// Cap on generation calls per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Deadline for a whole run in seconds.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Behavior on client failure.
    #[serde(default)]
    pub transport_fallback: TransportFallback,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            run_timeout_secs: default_run_timeout(),
            transport_fallback: TransportFallback::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON snapshot of the project store.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Style used when a project does not specify one.
    #[serde(default)]
    pub default_style: Style,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            state_file: default_state_file(),
            default_style: Style::default(),
        }
    }
}

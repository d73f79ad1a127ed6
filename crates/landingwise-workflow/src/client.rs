//! Client for the external text-generation endpoint.
//!
//! [`GenerationClient`] is the seam the workflow depends on.
//! [`OpenRouterClient`] talks to an OpenAI-compatible chat-completions API.
//! Failures are always reported as errors; substituting fallback content is
//! the workflow's decision, never the client's.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::error::{LandingError, LlmErrorKind, Result};

/// Role of a prompt message sent to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// Instructions.
    System,
    /// The user's request.
    User,
    /// Earlier model output.
    Assistant,
}

/// A role-tagged message sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message role.
    pub role: PromptRole,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

/// Sends prompts to a text-generation model.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Sends `messages` and returns the text of the first choice.
    ///
    /// # Errors
    ///
    /// `GenerationTransport` on network failure or non-2xx status,
    /// `MalformedResponse` when the payload has an unexpected shape.
    async fn invoke(&self, messages: &[PromptMessage]) -> Result<String>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extracts `choices[0].message.content` from a response body.
fn parse_completion(body: &str) -> Result<String> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| LandingError::malformed(format!("response is not valid JSON: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| LandingError::malformed("missing choices[0].message.content"))
}

// ============================================================================
// OpenRouterClient
// ============================================================================

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterClient {
    /// Builds a client from configuration and an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns `GenerationTransport` if the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&config.referer) {
            headers.insert("HTTP-Referer", value);
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&config.app_title) {
            headers.insert("X-Title", value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| LandingError::transport(LlmErrorKind::Other, e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Builds a client reading the API key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` if the variable is unset or empty.
    pub fn from_env(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LandingError::missing_api_key(&config.api_key_env))?;
        Self::new(config, api_key)
    }

    /// The full chat-completions URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Maps a reqwest failure to a transport error.
fn classify_reqwest_error(err: &reqwest::Error) -> LandingError {
    let kind = if err.is_timeout() {
        LlmErrorKind::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        LlmErrorKind::Network
    } else if let Some(status) = err.status() {
        LlmErrorKind::from_status(status.as_u16())
    } else {
        LlmErrorKind::Other
    };
    LandingError::transport(kind, err.to_string())
}

#[async_trait]
impl GenerationClient for OpenRouterClient {
    async fn invoke(&self, messages: &[PromptMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = messages.len(),
            "Sending generation request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Generation endpoint returned an error status");
            return Err(LandingError::transport(
                LlmErrorKind::from_status(status.as_u16()),
                format!("OpenRouter API error: {}", status.as_u16()),
            ));
        }

        let content = parse_completion(&body)?;
        debug!(content_len = content.len(), "Generation response received");
        Ok(content)
    }
}

// ============================================================================
// ScriptedClient
// ============================================================================

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedClient;

#[cfg(any(test, feature = "testing"))]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{GenerationClient, PromptMessage};
    use crate::error::{LandingError, LlmErrorKind, Result};

    /// A [`GenerationClient`] that replays canned replies.
    ///
    /// Once the queue is drained the last reply repeats. Every call's
    /// messages are recorded for inspection.
    #[derive(Debug, Default)]
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<std::result::Result<String, String>>>,
        last: Mutex<Option<std::result::Result<String, String>>>,
        calls: Mutex<Vec<Vec<PromptMessage>>>,
        delay: Option<Duration>,
    }

    impl ScriptedClient {
        /// Creates a client with an empty script.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a client that always returns `html`.
        #[must_use]
        pub fn always(html: impl Into<String>) -> Self {
            Self::new().then_ok(html)
        }

        /// Creates a client whose every call fails with a server error.
        #[must_use]
        pub fn failing(message: impl Into<String>) -> Self {
            Self::new().then_err(message)
        }

        /// Queues a successful reply.
        #[must_use]
        pub fn then_ok(self, html: impl Into<String>) -> Self {
            self.push(Ok(html.into()));
            self
        }

        /// Queues a transport failure.
        #[must_use]
        pub fn then_err(self, message: impl Into<String>) -> Self {
            self.push(Err(message.into()));
            self
        }

        /// Makes every call sleep first.
        #[must_use]
        pub const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn push(&self, reply: std::result::Result<String, String>) {
            if let Ok(mut replies) = self.replies.lock() {
                replies.push_back(reply);
            }
        }

        /// Messages of every call so far.
        #[must_use]
        pub fn calls(&self) -> Vec<Vec<PromptMessage>> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        /// Number of calls so far.
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls.lock().map(|c| c.len()).unwrap_or_default()
        }

        fn next_reply(&self) -> std::result::Result<String, String> {
            let queued = self.replies.lock().ok().and_then(|mut r| r.pop_front());
            let Ok(mut last) = self.last.lock() else {
                return Err("scripted client poisoned".to_string());
            };
            match queued {
                Some(reply) => {
                    *last = Some(reply.clone());
                    reply
                }
                None => last
                    .clone()
                    .unwrap_or_else(|| Err("scripted client has no replies".to_string())),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn invoke(&self, messages: &[PromptMessage]) -> Result<String> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(messages.to_vec());
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.next_reply()
                .map_err(|message| LandingError::transport(LlmErrorKind::Server, message))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let messages = vec![PromptMessage::system("sys"), PromptMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "meta-llama/llama-3.1-8b-instruct:free",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 4000,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "meta-llama/llama-3.1-8b-instruct:free");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["max_tokens"], 4000);
    }

    #[test]
    fn test_parse_completion_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"<html></html>"}},
                       {"message":{"content":"second"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "<html></html>");
    }

    #[test]
    fn test_parse_completion_malformed() {
        for body in [
            "not json",
            "{}",
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":null}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
        ] {
            let err = parse_completion(body).unwrap_err();
            assert!(
                matches!(err, LandingError::MalformedResponse { .. }),
                "expected malformed for {body}"
            );
        }
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = GenerationConfig {
            base_url: "https://openrouter.ai/api/v1/".to_string(),
            ..GenerationConfig::default()
        };
        let client = OpenRouterClient::new(&config, "key").unwrap();
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn test_from_env_missing_key() {
        let config = GenerationConfig {
            api_key_env: "LANDINGWISE_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..GenerationConfig::default()
        };
        let err = OpenRouterClient::from_env(&config).unwrap_err();
        assert!(matches!(err, LandingError::MissingApiKey { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..GenerationConfig::default()
        };
        let client = OpenRouterClient::new(&config, "key").unwrap();
        let err = client.invoke(&[PromptMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LandingError::GenerationTransport { .. }));
    }

    #[tokio::test]
    async fn test_scripted_client_replays_and_repeats_last() {
        let client = ScriptedClient::new().then_ok("first").then_err("down");

        assert_eq!(client.invoke(&[]).await.unwrap(), "first");
        assert!(client.invoke(&[]).await.is_err());
        assert!(client.invoke(&[]).await.is_err());
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_client_records_messages() {
        let client = ScriptedClient::always("<html></html>");
        client
            .invoke(&[PromptMessage::system("a"), PromptMessage::user("b")])
            .await
            .unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][1], PromptMessage::user("b"));
    }
}

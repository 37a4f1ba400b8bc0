//! Anthropic Provider Implementation
//!
//! Sends extraction requests to the Anthropic Messages API.
//!
//! # Features
//!
//! - Async HTTP communication with the Messages API
//! - Configurable endpoint, model and API version
//! - Retry logic with exponential backoff for 429 and 5xx responses
//! - Typed `Overflow` errors for inputs beyond the model's context window
//!
//! # Examples
//!
//! ```no_run
//! use papersift_llm::AnthropicClient;
//!
//! let client = AnthropicClient::new("sk-ant-...", "claude-3-7-sonnet-20250219")
//!     .unwrap()
//!     .with_max_retries(5);
//! ```

use async_trait::async_trait;
use papersift_domain::prompt::{render_user_message, SYSTEM_PROMPT};
use papersift_domain::{CompletionOptions, ExtractionQuery, LlmClient, LlmError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Anthropic API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Default timeout for LLM requests (10 minutes; long documents are slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound on a single retry delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Anthropic Messages API client
pub struct AnthropicClient {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
    initial_backoff: Duration,
}

/// Request body for the Messages API
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Response from the Messages API
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Error envelope returned with non-2xx statuses
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    ///
    /// # Parameters
    ///
    /// - `api_key`: Anthropic API key
    /// - `model`: Model to use (e.g., "claude-3-7-sonnet-20250219")
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Communication` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Point the client at a different base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the maximum number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the first backoff delay; later delays double
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Model used for requests
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.endpoint);

        // Retry logic with exponential backoff
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(body)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return parse_success(response).await;
                    }

                    let body_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let error = classify_error(status, &body_text);

                    if !is_retryable(status) {
                        return Err(error);
                    }
                    warn!("Anthropic API returned {} (attempt {})", status, attempts + 1);
                    last_error = Some(error);
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                tokio::time::sleep(self.backoff_delay(attempts)).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }

    /// Delay after the `attempt`-th failure: 1s, 2s, 4s, etc., capped at [`MAX_BACKOFF`]
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }
}

async fn parse_success(response: reqwest::Response) -> Result<String, LlmError> {
    let parsed: MessagesResponse = response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    if let Some(usage) = &parsed.usage {
        debug!(
            "Anthropic usage: {} input tokens, {} output tokens",
            usage.input_tokens, usage.output_tokens
        );
    }

    parsed
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| LlmError::InvalidResponse("Response contained no text block".to_string()))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Map a non-2xx response onto an error kind
///
/// The API reports an oversized prompt either as 413 or as a 400
/// `invalid_request_error` whose message says the prompt is too long.
fn classify_error(status: StatusCode, body: &str) -> LlmError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return LlmError::Overflow(message);
    }

    if status == StatusCode::BAD_REQUEST {
        if let Some(envelope) = &envelope {
            let lower = envelope.error.message.to_lowercase();
            if envelope.error.kind == "invalid_request_error"
                && (lower.contains("too long") || lower.contains("context window"))
            {
                return LlmError::Overflow(message);
            }
        }
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimitExceeded;
    }

    LlmError::Service(format!("HTTP {}: {}", status, message))
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn call(
        &self,
        text: &str,
        query: &ExtractionQuery,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: render_user_message(text, query.instruction()),
            }],
        };

        self.send(&body).await
    }
}

//! papersift LLM Client Layer
//!
//! Implementations of the `LlmClient` trait from `papersift-domain`.
//!
//! # Clients
//!
//! - `MockClient`: Deterministic, scriptable client for testing
//! - `AnthropicClient`: Anthropic Messages API over HTTP
//!
//! # Examples
//!
//! ```
//! use papersift_llm::MockClient;
//! use papersift_domain::{CompletionOptions, ExtractionQuery, LlmClient};
//!
//! # async fn example() {
//! let client = MockClient::new("\"a\",\"b\"");
//! let query = ExtractionQuery::new("extract", ["x", "y"]);
//! let result = client.call("text", &query, &CompletionOptions::default()).await.unwrap();
//! assert_eq!(result, "\"a\",\"b\"");
//! # }
//! ```

#![warn(missing_docs)]

pub mod anthropic;

use async_trait::async_trait;
use papersift_domain::{CompletionOptions, ExtractionQuery, LlmClient, LlmError, TokenCounter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use anthropic::AnthropicClient;

/// Mock LLM client for deterministic testing
///
/// Returns pre-configured responses without making any network calls. It can
/// also simulate a context limit, reporting `LlmError::Overflow` for any
/// document whose token count exceeds it. Clones share state, so a test can
/// hand one clone to the code under test and inspect the other.
///
/// # Examples
///
/// ```
/// use papersift_llm::MockClient;
/// use papersift_domain::{CompletionOptions, ExtractionQuery, LlmClient, LlmError};
///
/// # async fn example() {
/// let mut client = MockClient::default();
/// client.add_response("doc one", "response one");
/// client.add_error("doc two", LlmError::Service("boom".into()));
///
/// let query = ExtractionQuery::new("q", ["a"]);
/// let options = CompletionOptions::default();
/// assert_eq!(client.call("doc one", &query, &options).await.unwrap(), "response one");
/// assert!(client.call("doc two", &query, &options).await.is_err());
/// assert_eq!(client.call_count(), 2);
/// # }
/// ```
#[derive(Clone)]
pub struct MockClient {
    default_response: String,
    state: Arc<Mutex<MockState>>,
    context_limit: Option<(usize, Arc<dyn TokenCounter>)>,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, Result<String, LlmError>>,
    calls: Vec<String>,
}

impl MockClient {
    /// Create a new MockClient with a fixed response for all documents
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
            context_limit: None,
        }
    }

    /// Reject documents whose token count exceeds `limit` with `LlmError::Overflow`
    pub fn with_context_limit(mut self, limit: usize, counter: Arc<dyn TokenCounter>) -> Self {
        self.context_limit = Some((limit, counter));
        self
    }

    /// Add a specific response for a given document text
    pub fn add_response(&mut self, text: impl Into<String>, response: impl Into<String>) {
        self.state().responses.insert(text.into(), Ok(response.into()));
    }

    /// Configure to return an error for a specific document text
    pub fn add_error(&mut self, text: impl Into<String>, error: LlmError) {
        self.state().responses.insert(text.into(), Err(error));
    }

    /// Get the number of times `call` was invoked
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Document texts received so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn call(
        &self,
        text: &str,
        _query: &ExtractionQuery,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let mut state = self.state();
        state.calls.push(text.to_string());

        if let Some((limit, counter)) = &self.context_limit {
            let tokens = counter.count(text);
            if tokens > *limit {
                return Err(LlmError::Overflow(format!(
                    "prompt is too long: {} tokens > {} maximum",
                    tokens, limit
                )));
            }
        }

        match state.responses.get(text) {
            Some(scripted) => scripted.clone(),
            None => Ok(self.default_response.clone()),
        }
    }
}

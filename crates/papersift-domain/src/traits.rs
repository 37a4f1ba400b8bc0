//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the extraction core and
//! infrastructure. Implementations live in other crates.

use crate::error::LlmError;
use crate::query::ExtractionQuery;
use async_trait::async_trait;
use std::path::Path;

/// Sampling options for a single completion request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_output_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 1000,
        }
    }
}

/// Trait for LLM completion services
///
/// Implemented by the infrastructure layer (papersift-llm)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Ask the model to apply `query` to `text`
    ///
    /// Must return `LlmError::Overflow` when the input exceeds the service's
    /// context limit so callers can shrink and retry.
    async fn call(
        &self,
        text: &str,
        query: &ExtractionQuery,
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

/// Trait for counting and truncating tokens
///
/// Implementations must be deterministic and must satisfy
/// `count(&truncate(text, n)) <= n`, truncating to a prefix of the text.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Longest prefix of `text` that fits in `max_tokens`
    fn truncate(&self, text: &str, max_tokens: usize) -> String;
}

/// Trait for turning a document on disk into plain text
///
/// Implemented by the application layer (papersift-cli). The same file must
/// always produce the same text, or cache keys stop matching.
pub trait TextSource {
    /// Error type for extraction failures
    type Error: std::fmt::Display;

    /// Extract the full text of the document at `path`
    fn extract_text(&self, path: &Path) -> Result<String, Self::Error>;
}

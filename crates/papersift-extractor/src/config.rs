//! Configuration for the Extractor

use papersift_domain::CompletionOptions;
use serde::{Deserialize, Serialize};

/// Prompt fragments that mark a response line as an echo of the instruction
pub const DEFAULT_IGNORED_FRAGMENTS: &[&str] = &["research question", "csv format"];

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Token budget shared by all calls in any trailing 60-second window
    pub tokens_per_minute: usize,

    /// Fraction of the current length kept on each shrink step
    pub truncation_ratio: f64,

    /// Documents are never shrunk below this many tokens
    pub min_truncation_tokens: usize,

    /// Upper bound on shrink steps for one document
    pub max_shrink_steps: usize,

    /// Model context window; longer documents are cut before the first call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_context_tokens: Option<usize>,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_output_tokens: u32,

    /// Response lines containing any of these (case-insensitive) are skipped
    pub ignored_line_fragments: Vec<String>,
}

impl ExtractorConfig {
    /// Sampling options passed to the LLM client
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tokens_per_minute == 0 {
            return Err("tokens_per_minute must be greater than 0".to_string());
        }
        if !(self.truncation_ratio > 0.0 && self.truncation_ratio < 1.0) {
            return Err("truncation_ratio must be between 0 and 1 (exclusive)".to_string());
        }
        if self.min_truncation_tokens == 0 {
            return Err("min_truncation_tokens must be greater than 0".to_string());
        }
        if self.max_shrink_steps == 0 {
            return Err("max_shrink_steps must be greater than 0".to_string());
        }
        if let Some(max_context) = self.max_context_tokens {
            if max_context <= self.min_truncation_tokens {
                return Err("max_context_tokens must exceed min_truncation_tokens".to_string());
            }
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("temperature must be within [0.0, 1.0]".to_string());
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    /// Limits of the Anthropic tier the pipeline was tuned against
    fn default() -> Self {
        Self {
            tokens_per_minute: 20_000,
            truncation_ratio: 0.8,
            min_truncation_tokens: 1_000,
            max_shrink_steps: 20,
            max_context_tokens: Some(200_000),
            temperature: 0.0,
            max_output_tokens: 1_000,
            ignored_line_fragments: DEFAULT_IGNORED_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

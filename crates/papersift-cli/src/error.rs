//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extractor error (cache, store, configuration)
    #[error("Extractor error: {0}")]
    Extractor(#[from] papersift_extractor::ExtractorError),

    /// LLM client construction error
    #[error("LLM client error: {0}")]
    Llm(#[from] papersift_domain::LlmError),

    /// Document text could not be read
    #[error("Text extraction error: {0}")]
    TextExtraction(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

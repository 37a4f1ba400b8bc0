//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Input too large for the service; recovered by shrinking
    #[error("Input too large: {0}")]
    Overflow(String),

    /// Non-overflow client failure, or a shrink step that cannot make progress
    #[error("Processing error: {0}")]
    Processing(String),

    /// Raw response could not be reduced to a structured row
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Result store error
    #[error("Store error: {0}")]
    Store(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}

impl From<csv::Error> for ExtractorError {
    fn from(e: csv::Error) -> Self {
        ExtractorError::Store(e.to_string())
    }
}

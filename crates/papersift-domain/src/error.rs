//! Error kinds reported by LLM clients

use thiserror::Error;

/// Errors an `LlmClient` can report
///
/// `Overflow` is the only kind the orchestrator recovers from locally; every
/// other kind ends processing of the current document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The input exceeds the service's context limit
    #[error("Input exceeds context limit: {0}")]
    Overflow(String),

    /// The service rejected or failed the request
    #[error("Service error: {0}")]
    Service(String),

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The service answered but the body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded on the service side
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl LlmError {
    /// Whether the error means the input must shrink before retrying
    pub fn is_overflow(&self) -> bool {
        matches!(self, LlmError::Overflow(_))
    }
}

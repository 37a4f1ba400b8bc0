//! Result types for extraction

use papersift_domain::{CacheKey, ExtractionRecord};
use std::time::Duration;

/// Outcome of extracting one document
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// The record to persist
    pub record: ExtractionRecord,

    /// Metadata about the extraction
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Whether the record is a success
    pub fn is_success(&self) -> bool {
        self.record.is_success()
    }
}

/// Metadata about an extraction
#[derive(Debug, Clone)]
pub struct ExtractionMetadata {
    /// Source document name
    pub filename: String,

    /// Key of the full, untruncated text
    pub cache_key: CacheKey,

    /// Whether the response came from the cache without calling the model
    pub cache_hit: bool,

    /// Model calls made for this document
    pub llm_calls: usize,

    /// Shrink steps taken, including a pre-fit cut
    pub shrinks: usize,

    /// Token count of the full text
    pub initial_tokens: usize,

    /// Token count of the text sent in the last model call
    ///
    /// `None` on a cache hit: the cached response may have come from a
    /// truncated prefix in an earlier run.
    pub final_tokens: Option<usize>,

    /// Time spent waiting on the rate limiter
    pub rate_limit_wait: Duration,

    /// Wall time for the whole extraction
    pub processing_time_ms: u64,
}

impl ExtractionMetadata {
    /// Whether the text was cut during this run
    pub fn was_truncated(&self) -> bool {
        self.shrinks > 0
    }
}

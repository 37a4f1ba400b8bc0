//! papersift Extractor
//!
//! Runs documents through an LLM to fill a fixed set of fields, within a
//! per-minute token budget and without paying twice for the same input.
//!
//! # Architecture
//!
//! ```text
//! text → Cache? → RateLimiter → LlmClient → Cache → ResponseParser → ExtractionRecord
//!                      ↑                        │
//!                      └──── shrink on overflow ┘
//! ```
//!
//! # Key Features
//!
//! - **Content-addressed cache**: responses are keyed by a digest of the text
//!   and query, persisted after every write
//! - **Sliding-window rate limiting**: calls wait until the trailing minute
//!   has room for their token cost
//! - **Adaptive truncation**: documents the service rejects as too long are
//!   cut to a shorter prefix and retried
//! - **Tolerant parsing**: one CSV row is recovered from chatty model output
//!
//! # Example Usage
//!
//! ```no_run
//! use papersift_extractor::{default_query, Extractor, ExtractorConfig, ResponseCache};
//! use papersift_llm::MockClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MockClient::new("\"Smith (2020)\",\"Journal article\"");
//! let cache = ResponseCache::open("prompt_cache/extraction_prompt_cache.json")?;
//! let extractor = Extractor::new(client, cache, default_query(), ExtractorConfig::default())?;
//!
//! let result = extractor.extract("paper.pdf", "Full text of the paper").await;
//! println!("citation: {:?}", result.record.value("paper_citation"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod extractor;
mod parser;
mod prompt;
mod rate_limiter;
mod store;
mod tokens;
mod types;

#[cfg(test)]
mod tests;

pub use cache::ResponseCache;
pub use config::{ExtractorConfig, DEFAULT_IGNORED_FRAGMENTS};
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use parser::{CsvRowParser, ResponseParser};
pub use prompt::{default_query, gcr_field_names, gcr_instruction, GCR_FIELDS, RESEARCH_QUESTION};
pub use rate_limiter::{Admission, RateLimiter, TokenUsageWindow, WINDOW};
pub use store::ResultStore;
#[cfg(feature = "hf-tokenizer")]
pub use tokens::HfTokenCounter;
pub use tokens::EstimatingTokenCounter;
pub use types::{ExtractionMetadata, ExtractionResult};

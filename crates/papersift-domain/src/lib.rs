//! papersift Domain Layer
//!
//! This crate contains the value types and collaborator interfaces shared by
//! every other papersift crate. It holds no I/O of its own.
//!
//! ## Key Concepts
//!
//! - **ExtractionQuery**: the instruction sent to the model plus the ordered
//!   field names expected back
//! - **CacheKey**: content digest of (document text, query), the unit of
//!   at-most-once cost
//! - **ExtractionRecord**: either a complete field set or a filename with an
//!   error, never a mix of both
//! - **Collaborators**: `LlmClient`, `TokenCounter` and `TextSource` are the
//!   seams where infrastructure plugs in
//!
//! ## Architecture
//!
//! - Pure value types and trait definitions
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache_key;
pub mod error;
pub mod prompt;
pub mod query;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use cache_key::CacheKey;
pub use error::LlmError;
pub use query::ExtractionQuery;
pub use record::{ExtractionRecord, FieldValue};
pub use traits::{CompletionOptions, LlmClient, TextSource, TokenCounter};
